//! Glyph atlas: rectangle packing over growable bitmap surfaces.
//!
//! Each surface tracks a free-rectangle list and a used-rectangle list that
//! together partition the surface. Placement uses best-short-side-fit: the
//! free rectangle leaving the smallest short-side slack wins, ties go to the
//! first candidate in list order. The chosen rectangle is guillotine-split
//! into at most two new free rectangles which take its place in the list.
//!
//! Rectangles are never merged or reclaimed. When the current surface is full
//! and multi-surface growth is enabled, a new surface of the same size is
//! appended; `clear()` resets the atlas to a single empty surface.

use crate::glyph::Glyph;
use crate::rasterizer::{GlyphFormat, RasterizedGlyph};
use crate::{Result, TextError};

/// Pixel-space rectangle within an atlas surface
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct GlyphRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl GlyphRect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn zero() -> Self {
        Self::new(0, 0, 0, 0)
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// True if the two rectangles share any interior area
    pub fn intersects(&self, other: &GlyphRect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn contains(&self, other: &GlyphRect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

/// A region within the atlas texture (UV coordinates normalized to [0,1]).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UvRect {
    pub u_min: f32,
    pub v_min: f32,
    pub u_max: f32,
    pub v_max: f32,
}

/// Pixel format of an atlas surface
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// Single-channel coverage
    #[default]
    Alpha8,
    /// Premultiplied color (color emoji, sprites)
    Rgba,
}

impl RenderMode {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            RenderMode::Alpha8 => 1,
            RenderMode::Rgba => 4,
        }
    }
}

/// Free-rectangle selection heuristic
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackingMode {
    /// Smallest short-side slack wins
    #[default]
    BestShortSideFit,
    /// Smallest leftover area wins, short side breaks ties
    BestAreaFit,
}

/// One fixed-size atlas bitmap with its packing state
#[derive(Debug, Clone)]
pub struct AtlasSurface {
    width: u32,
    height: u32,
    free_rects: Vec<GlyphRect>,
    used_rects: Vec<GlyphRect>,
    render_mode: RenderMode,
    pixels: Vec<u8>,
    dirty: bool,
}

impl AtlasSurface {
    /// Create an empty surface seeded with one free rectangle covering it
    pub fn new(width: u32, height: u32, render_mode: RenderMode) -> Self {
        let byte_count = width as usize * height as usize * render_mode.bytes_per_pixel();
        Self {
            width,
            height,
            free_rects: vec![GlyphRect::new(0, 0, width, height)],
            used_rects: Vec::new(),
            render_mode,
            pixels: vec![0u8; byte_count],
            dirty: false,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn render_mode(&self) -> RenderMode {
        self.render_mode
    }

    pub fn free_rects(&self) -> &[GlyphRect] {
        &self.free_rects
    }

    pub fn used_rects(&self) -> &[GlyphRect] {
        &self.used_rects
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Whether pixels changed since the last `mark_clean`
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Fraction of the surface covered by used rectangles
    pub fn occupancy(&self) -> f32 {
        let total = self.width as u64 * self.height as u64;
        if total == 0 {
            return 1.0;
        }
        let used: u64 = self.used_rects.iter().map(GlyphRect::area).sum();
        used as f32 / total as f32
    }

    /// Try to place a `width`x`height` glyph with `padding` on every side.
    ///
    /// Returns the inner glyph rectangle; the padded rectangle is what moves
    /// to the used list.
    pub fn try_pack(
        &mut self,
        width: u32,
        height: u32,
        padding: u32,
        mode: PackingMode,
    ) -> Option<GlyphRect> {
        let padded_w = width + padding * 2;
        let padded_h = height + padding * 2;

        let index = self.find_free_rect(padded_w, padded_h, mode)?;
        let free = self.free_rects[index];
        let placed = GlyphRect::new(free.x, free.y, padded_w, padded_h);

        let pieces = split_free_rect(free, padded_w, padded_h);
        self.free_rects
            .splice(index..=index, pieces.into_iter().flatten());
        self.used_rects.push(placed);

        Some(GlyphRect::new(
            placed.x + padding,
            placed.y + padding,
            width,
            height,
        ))
    }

    /// Index of the best free rectangle; the first one wins on ties
    fn find_free_rect(&self, width: u32, height: u32, mode: PackingMode) -> Option<usize> {
        let mut best: Option<(usize, (u64, u64))> = None;

        for (i, free) in self.free_rects.iter().enumerate() {
            if width > free.width || height > free.height {
                continue;
            }
            let leftover_w = (free.width - width) as u64;
            let leftover_h = (free.height - height) as u64;
            let short = leftover_w.min(leftover_h);
            let score = match mode {
                PackingMode::BestShortSideFit => (short, 0),
                PackingMode::BestAreaFit => (free.area() - width as u64 * height as u64, short),
            };

            match best {
                Some((_, best_score)) if score >= best_score => {}
                _ => best = Some((i, score)),
            }
        }

        best.map(|(i, _)| i)
    }

    /// Copy a glyph bitmap into the surface at `rect`.
    ///
    /// Alpha bitmaps written into RGBA surfaces become white with coverage in
    /// the alpha channel; RGBA bitmaps written into alpha surfaces keep only
    /// their alpha.
    pub fn blit(&mut self, rect: &GlyphRect, bitmap: &[u8], format: GlyphFormat) {
        let src_bpp = match format {
            GlyphFormat::Alpha => 1,
            GlyphFormat::Rgba => 4,
        };
        let dst_bpp = self.render_mode.bytes_per_pixel();

        if bitmap.len() < rect.width as usize * rect.height as usize * src_bpp {
            tracing::warn!(
                "Bitmap too small for {}x{} glyph ({} bytes)",
                rect.width,
                rect.height,
                bitmap.len()
            );
            return;
        }

        for row in 0..rect.height {
            for col in 0..rect.width {
                let dst_x = rect.x + col;
                let dst_y = rect.y + row;
                if dst_x >= self.width || dst_y >= self.height {
                    continue;
                }
                let dst_idx = (dst_y as usize * self.width as usize + dst_x as usize) * dst_bpp;
                let src_idx = (row as usize * rect.width as usize + col as usize) * src_bpp;

                match (format, self.render_mode) {
                    (GlyphFormat::Alpha, RenderMode::Alpha8) => {
                        self.pixels[dst_idx] = bitmap[src_idx];
                    }
                    (GlyphFormat::Alpha, RenderMode::Rgba) => {
                        self.pixels[dst_idx] = 255;
                        self.pixels[dst_idx + 1] = 255;
                        self.pixels[dst_idx + 2] = 255;
                        self.pixels[dst_idx + 3] = bitmap[src_idx];
                    }
                    (GlyphFormat::Rgba, RenderMode::Alpha8) => {
                        self.pixels[dst_idx] = bitmap[src_idx + 3];
                    }
                    (GlyphFormat::Rgba, RenderMode::Rgba) => {
                        self.pixels[dst_idx..dst_idx + 4]
                            .copy_from_slice(&bitmap[src_idx..src_idx + 4]);
                    }
                }
            }
        }

        self.dirty = true;
    }
}

/// Guillotine split along the shorter leftover axis.
///
/// The two pieces plus the placed rectangle partition `free` exactly.
fn split_free_rect(free: GlyphRect, width: u32, height: u32) -> [Option<GlyphRect>; 2] {
    let leftover_w = free.width - width;
    let leftover_h = free.height - height;

    let (right, bottom) = if leftover_w <= leftover_h {
        (
            GlyphRect::new(free.x + width, free.y, leftover_w, height),
            GlyphRect::new(free.x, free.y + height, free.width, leftover_h),
        )
    } else {
        (
            GlyphRect::new(free.x + width, free.y, leftover_w, free.height),
            GlyphRect::new(free.x, free.y + height, width, leftover_h),
        )
    };

    let keep = |r: GlyphRect| (!r.is_empty()).then_some(r);
    [keep(right), keep(bottom)]
}

/// Append-only multi-surface glyph atlas
#[derive(Debug, Clone)]
pub struct GlyphAtlas {
    surfaces: Vec<AtlasSurface>,
    width: u32,
    height: u32,
    padding: u32,
    render_mode: RenderMode,
    packing_mode: PackingMode,
    multi_atlas: bool,
    max_surfaces: usize,
}

impl GlyphAtlas {
    /// Create an atlas with one empty surface and growth disabled
    pub fn new(width: u32, height: u32, padding: u32, render_mode: RenderMode) -> Self {
        Self {
            surfaces: vec![AtlasSurface::new(width, height, render_mode)],
            width,
            height,
            padding,
            render_mode,
            packing_mode: PackingMode::default(),
            multi_atlas: false,
            max_surfaces: 1,
        }
    }

    /// Allow growth to additional surfaces, capped at `max_surfaces`
    pub fn with_multi_atlas(mut self, enabled: bool, max_surfaces: usize) -> Self {
        self.multi_atlas = enabled;
        self.max_surfaces = max_surfaces.max(1);
        self
    }

    pub fn with_packing_mode(mut self, mode: PackingMode) -> Self {
        self.packing_mode = mode;
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn padding(&self) -> u32 {
        self.padding
    }

    pub fn render_mode(&self) -> RenderMode {
        self.render_mode
    }

    pub fn surfaces(&self) -> &[AtlasSurface] {
        &self.surfaces
    }

    pub fn surface(&self, index: usize) -> Option<&AtlasSurface> {
        self.surfaces.get(index)
    }

    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_dirty(&self) -> bool {
        self.surfaces.iter().any(AtlasSurface::is_dirty)
    }

    pub fn mark_clean(&mut self) {
        for surface in &mut self.surfaces {
            surface.mark_clean();
        }
    }

    /// Allocate space for a glyph, growing to a new surface when allowed.
    ///
    /// Returns the surface index and the inner glyph rectangle.
    pub fn pack(&mut self, width: u32, height: u32) -> Result<(usize, GlyphRect)> {
        let exhausted = TextError::CapacityExhausted { width, height };
        let current = self.surfaces.len() - 1;

        if let Some(rect) =
            self.surfaces[current].try_pack(width, height, self.padding, self.packing_mode)
        {
            return Ok((current, rect));
        }

        // A fresh surface cannot hold what is larger than a surface.
        let padded_w = width + self.padding * 2;
        let padded_h = height + self.padding * 2;
        if padded_w > self.width || padded_h > self.height {
            return Err(exhausted);
        }

        if !self.multi_atlas || self.surfaces.len() >= self.max_surfaces {
            tracing::debug!(
                "Atlas full: {} surface(s), growth {}",
                self.surfaces.len(),
                if self.multi_atlas { "capped" } else { "disabled" }
            );
            return Err(exhausted);
        }

        // Logical capacity doubles with every growth step.
        let len = self.surfaces.len();
        self.surfaces.reserve(len);
        self.surfaces
            .push(AtlasSurface::new(self.width, self.height, self.render_mode));
        let index = self.surfaces.len() - 1;
        tracing::debug!("Atlas grew to {} surfaces", self.surfaces.len());

        self.surfaces[index]
            .try_pack(width, height, self.padding, self.packing_mode)
            .map(|rect| (index, rect))
            .ok_or(exhausted)
    }

    /// Pack and blit a batch of rasterized glyphs.
    ///
    /// Returns whether every glyph was placed, plus the glyphs that were.
    /// Glyphs without a bitmap (spaces) get an empty rectangle.
    pub fn pack_glyphs(&mut self, rasterized: &[RasterizedGlyph]) -> (bool, Vec<Glyph>) {
        let mut all_placed = true;
        let mut placed = Vec::with_capacity(rasterized.len());

        for raster in rasterized {
            match self.place(raster) {
                Ok(glyph) => placed.push(glyph),
                Err(err) => {
                    tracing::warn!("Glyph {} not packed: {}", raster.index, err);
                    all_placed = false;
                }
            }
        }

        (all_placed, placed)
    }

    /// Pack and blit a single rasterized glyph
    pub fn place(&mut self, raster: &RasterizedGlyph) -> Result<Glyph> {
        let mut glyph = Glyph::new(raster.index, raster.metrics, GlyphRect::zero());
        if raster.width == 0 || raster.height == 0 {
            glyph.atlas_index = self.surfaces.len() - 1;
            return Ok(glyph);
        }

        let (atlas_index, rect) = self.pack(raster.width, raster.height)?;
        self.surfaces[atlas_index].blit(&rect, &raster.bitmap, raster.format);
        glyph.rect = rect;
        glyph.atlas_index = atlas_index;
        Ok(glyph)
    }

    /// Normalized UV rectangle for a glyph rectangle
    pub fn uv_rect(&self, rect: &GlyphRect) -> UvRect {
        let inv_w = 1.0 / self.width.max(1) as f32;
        let inv_h = 1.0 / self.height.max(1) as f32;
        UvRect {
            u_min: rect.x as f32 * inv_w,
            v_min: rect.y as f32 * inv_h,
            u_max: rect.right() as f32 * inv_w,
            v_max: rect.bottom() as f32 * inv_h,
        }
    }

    /// Reset to a single empty surface
    pub fn clear(&mut self) {
        self.surfaces.clear();
        self.surfaces
            .push(AtlasSurface::new(self.width, self.height, self.render_mode));
        self.surfaces[0].dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use crate::glyph::GlyphMetrics;
    use super::*;

    fn assert_partition(surface: &AtlasSurface) {
        let bounds = GlyphRect::new(0, 0, surface.width(), surface.height());
        let all: Vec<GlyphRect> = surface
            .free_rects()
            .iter()
            .chain(surface.used_rects())
            .copied()
            .collect();

        for (i, a) in all.iter().enumerate() {
            assert!(bounds.contains(a), "{a:?} escapes the surface");
            for b in &all[i + 1..] {
                assert!(!a.intersects(b), "{a:?} overlaps {b:?}");
            }
        }

        let area: u64 = all.iter().map(GlyphRect::area).sum();
        assert_eq!(area, bounds.area(), "free + used must cover the surface");
    }

    #[test]
    fn test_surface_starts_with_single_free_rect() {
        let surface = AtlasSurface::new(64, 32, RenderMode::Alpha8);
        assert_eq!(surface.free_rects(), &[GlyphRect::new(0, 0, 64, 32)]);
        assert!(surface.used_rects().is_empty());
        assert_eq!(surface.pixels().len(), 64 * 32);
        assert!(!surface.is_dirty());
    }

    #[test]
    fn test_pack_applies_padding() {
        let mut surface = AtlasSurface::new(64, 64, RenderMode::Alpha8);
        let rect = surface
            .try_pack(10, 12, 2, PackingMode::BestShortSideFit)
            .unwrap();
        assert_eq!(rect, GlyphRect::new(2, 2, 10, 12));
        assert_eq!(surface.used_rects(), &[GlyphRect::new(0, 0, 14, 16)]);
        assert_partition(&surface);
    }

    #[test]
    fn test_partition_holds_under_mixed_sizes() {
        let mut surface = AtlasSurface::new(128, 128, RenderMode::Alpha8);
        let sizes = [
            (10, 20),
            (33, 7),
            (5, 5),
            (40, 40),
            (17, 29),
            (1, 64),
            (64, 1),
            (12, 12),
            (25, 3),
            (9, 31),
        ];
        for (w, h) in sizes.iter().cycle().take(60) {
            let _ = surface.try_pack(*w, *h, 1, PackingMode::BestShortSideFit);
            assert_partition(&surface);
        }
    }

    #[test]
    fn test_best_short_side_fit_prefers_tight_rect() {
        let mut surface = AtlasSurface::new(100, 100, RenderMode::Alpha8);
        surface.free_rects = vec![
            GlyphRect::new(0, 0, 50, 50),
            GlyphRect::new(50, 0, 12, 100),
            GlyphRect::new(0, 50, 50, 50),
        ];
        let rect = surface
            .try_pack(10, 10, 0, PackingMode::BestShortSideFit)
            .unwrap();
        assert_eq!((rect.x, rect.y), (50, 0));
    }

    #[test]
    fn test_ties_go_to_first_rect_in_list_order() {
        let mut surface = AtlasSurface::new(100, 100, RenderMode::Alpha8);
        surface.free_rects = vec![
            GlyphRect::new(0, 50, 20, 20),
            GlyphRect::new(0, 0, 20, 20),
        ];
        let rect = surface
            .try_pack(10, 10, 0, PackingMode::BestShortSideFit)
            .unwrap();
        assert_eq!((rect.x, rect.y), (0, 50));
    }

    #[test]
    fn test_equal_short_side_ignores_long_side() {
        let mut surface = AtlasSurface::new(100, 100, RenderMode::Alpha8);
        surface
            .try_pack(70, 80, 0, PackingMode::BestShortSideFit)
            .unwrap();
        assert_eq!(
            surface.free_rects(),
            &[GlyphRect::new(70, 0, 30, 100), GlyphRect::new(0, 80, 70, 20)]
        );

        // Both leave 10px on the short side; the second has less long-side slack.
        let rect = surface
            .try_pack(20, 10, 0, PackingMode::BestShortSideFit)
            .unwrap();
        assert_eq!((rect.x, rect.y), (70, 0));
        assert_partition(&surface);
    }

    #[test]
    fn test_split_replaces_chosen_rect_in_place() {
        let mut surface = AtlasSurface::new(100, 100, RenderMode::Alpha8);
        surface.free_rects = vec![GlyphRect::new(0, 0, 30, 30), GlyphRect::new(30, 0, 70, 100)];
        surface
            .try_pack(30, 10, 0, PackingMode::BestShortSideFit)
            .unwrap();
        // Exact width fit leaves a single bottom piece at the same index.
        assert_eq!(surface.free_rects()[0], GlyphRect::new(0, 10, 30, 20));
        assert_eq!(surface.free_rects()[1], GlyphRect::new(30, 0, 70, 100));
    }

    #[test]
    fn test_growth_disabled_reports_capacity_exhausted() {
        let mut atlas = GlyphAtlas::new(32, 32, 0, RenderMode::Alpha8);
        assert!(atlas.pack(32, 32).is_ok());
        assert_eq!(
            atlas.pack(4, 4),
            Err(TextError::CapacityExhausted {
                width: 4,
                height: 4
            })
        );
        assert_eq!(atlas.surface_count(), 1);
    }

    #[test]
    fn test_growth_appends_same_size_surface() {
        let mut atlas = GlyphAtlas::new(32, 32, 0, RenderMode::Alpha8).with_multi_atlas(true, 3);
        assert_eq!(atlas.pack(32, 32).unwrap().0, 0);
        let (index, rect) = atlas.pack(16, 16).unwrap();
        assert_eq!(index, 1);
        assert_eq!(rect, GlyphRect::new(0, 0, 16, 16));
        assert_eq!(atlas.surface(1).unwrap().width(), 32);
    }

    #[test]
    fn test_growth_stops_at_surface_cap() {
        let mut atlas = GlyphAtlas::new(16, 16, 0, RenderMode::Alpha8).with_multi_atlas(true, 2);
        atlas.pack(16, 16).unwrap();
        atlas.pack(16, 16).unwrap();
        assert!(matches!(
            atlas.pack(16, 16),
            Err(TextError::CapacityExhausted { .. })
        ));
        assert_eq!(atlas.surface_count(), 2);
    }

    #[test]
    fn test_oversized_glyph_never_grows() {
        let mut atlas = GlyphAtlas::new(16, 16, 1, RenderMode::Alpha8).with_multi_atlas(true, 8);
        assert!(atlas.pack(15, 15).is_err());
        assert_eq!(atlas.surface_count(), 1);
    }

    #[test]
    fn test_clear_resets_to_single_empty_surface() {
        let mut atlas = GlyphAtlas::new(16, 16, 0, RenderMode::Alpha8).with_multi_atlas(true, 4);
        atlas.pack(16, 16).unwrap();
        atlas.pack(16, 16).unwrap();
        atlas.clear();
        assert_eq!(atlas.surface_count(), 1);
        assert_eq!(atlas.surfaces()[0].free_rects().len(), 1);
        assert!(atlas.surfaces()[0].used_rects().is_empty());
    }

    #[test]
    fn test_place_blits_alpha_bitmap() {
        let mut atlas = GlyphAtlas::new(8, 8, 0, RenderMode::Rgba);
        let raster = RasterizedGlyph {
            index: 3,
            metrics: GlyphMetrics::new(2.0, 2.0, 0.0, 2.0, 3.0),
            width: 2,
            height: 2,
            bitmap: vec![10, 20, 30, 40],
            format: GlyphFormat::Alpha,
        };
        let glyph = atlas.place(&raster).unwrap();
        assert_eq!(glyph.rect, GlyphRect::new(0, 0, 2, 2));
        let pixels = atlas.surfaces()[0].pixels();
        assert_eq!(&pixels[0..4], &[255, 255, 255, 10]);
        assert!(atlas.is_dirty());
        atlas.mark_clean();
        assert!(!atlas.is_dirty());
    }

    #[test]
    fn test_pack_glyphs_reports_partial_failure() {
        let mut atlas = GlyphAtlas::new(8, 8, 0, RenderMode::Alpha8);
        let make = |index: u32, size: u32| RasterizedGlyph {
            index,
            metrics: GlyphMetrics::default(),
            width: size,
            height: size,
            bitmap: vec![255; (size * size) as usize],
            format: GlyphFormat::Alpha,
        };
        let (all_placed, glyphs) = atlas.pack_glyphs(&[make(1, 8), make(2, 4), make(3, 0)]);
        assert!(!all_placed);
        assert_eq!(
            glyphs.iter().map(|g| g.index).collect::<Vec<_>>(),
            vec![1, 3]
        );
    }

    #[test]
    fn test_uv_rect_normalized() {
        let atlas = GlyphAtlas::new(100, 50, 0, RenderMode::Alpha8);
        let uv = atlas.uv_rect(&GlyphRect::new(10, 5, 20, 10));
        assert!((uv.u_min - 0.1).abs() < 1e-6);
        assert!((uv.v_min - 0.1).abs() < 1e-6);
        assert!((uv.u_max - 0.3).abs() < 1e-6);
        assert!((uv.v_max - 0.3).abs() < 1e-6);
    }
}
