//! Software renderer: walls, floors and ceilings, then things.
//!
//! A frame walks the BSP front to back. Each seg facing the viewer is
//! clipped to the field of view and to columns already closed by solid
//! walls; its visible columns are drawn as shaded wall runs and the space
//! above and below them is recorded into visplanes. Planes are then drawn
//! as flat spans, and things are projected, sorted far to near and clipped
//! against the walls in front of them.
//!
//! Walls carry no texture data here: each wall texture name picks a palette
//! colour, shaded by distance through the `scalelight` table.

use std::sync::Arc;

use crate::angle::{ANG90, ANG180, Angle, fine_index, point_to_angle};
use crate::bsp::{BoxSpan, BspVisitor, bbox_span, bsp_walk};
use crate::constants::SKY_FLAT_NAME;
use crate::draw::{
    ColumnDraw, MaskedColumn, SpanDraw, draw_column, draw_masked_column, draw_span, fill_column,
};
use crate::fixed::{FRACBITS, FRACUNIT, Fixed, MAXINT, MININT, fixed_div, fixed_mul};
use crate::flats::{FLAT_BYTES, FLAT_SIZE, Flat, FlatStore};
use crate::framebuffer::PixelSink;
use crate::geometry::{BoundingBox, FRONT, point_distance, point_on_side};
use crate::info::{FF_FRAMEMASK, FF_FULLBRIGHT};
use crate::map::{MapData, Sector, Seg};
use crate::mobj::{Mobj, MobjId, MobjList};
use crate::palette::DoomPalette;
use crate::picture::Picture;
use crate::planes::PlaneSet;
use crate::player::PlayerState;
use crate::projection::RenderTables;
use crate::sprites::{SpriteStore, rotation_index};
use crate::tables::{fine_cosine, fine_sine};

/// Wall edges are stepped with 4 extra bits of precision.
const HEIGHTBITS: i32 = 12;
const HEIGHTUNIT: i32 = 1 << HEIGHTBITS;
/// Things nearer than this to the view plane are not drawn.
const MINZ: Fixed = 4 * FRACUNIT;
/// Picnum of a flat the store does not have.
const NO_FLAT: usize = usize::MAX;
/// Picnum standing in for the sky when no sky flat is loaded.
const MISSING_SKY: usize = usize::MAX - 1;
const SKY_TEXTURE_MID: Fixed = 100 * FRACUNIT;
const ANGLETOSKYSHIFT: u32 = 22;
/// Palette index for sky columns without a sky flat.
const SKY_FALLBACK_COLOR: u8 = 200;

/// Where the frame is seen from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct View {
    pub x: Fixed,
    pub y: Fixed,
    /// Eye height.
    pub z: Fixed,
    pub angle: Angle,
    /// Added to every light row; weapon flashes brighten the world.
    pub extra_light: i32,
}

impl View {
    pub fn from_player(player: &PlayerState) -> Self {
        Self {
            x: player.x,
            y: player.y,
            z: player.view_z,
            angle: player.angle,
            extra_light: 0,
        }
    }
}

/// Everything a frame reads.
#[derive(Clone, Copy)]
pub struct Scene<'a> {
    pub map: &'a MapData,
    pub mobjs: &'a MobjList,
    pub sprites: &'a SpriteStore,
    pub flats: &'a FlatStore,
    pub palette: &'a DoomPalette,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub subsectors: usize,
    /// Wall ranges drawn.
    pub wall_ranges: usize,
    pub planes: usize,
    pub sprites: usize,
}

/// Palette index for a texture or sprite name.
pub fn name_color(name: &str) -> u8 {
    let hash = name.bytes().fold(0x811c_9dc5u32, |h, b| {
        (h ^ u32::from(b.to_ascii_uppercase())).wrapping_mul(0x0100_0193)
    });
    64 + (hash % 160) as u8
}

/// Sprite clipping left behind by one wall range.
#[derive(Debug, Clone)]
struct DrawSeg {
    seg: usize,
    x1: i32,
    x2: i32,
    scale1: Fixed,
    scale2: Fixed,
    /// Things whose top is above this height are clipped by `top_clip`
    /// (last covered row per column from `x1`).
    top: Option<(Fixed, Vec<i32>)>,
    /// Things whose feet are below this height are clipped by
    /// `bottom_clip` (first covered row per column from `x1`).
    bottom: Option<(Fixed, Vec<i32>)>,
}

#[derive(Debug, Clone)]
enum SpriteSource {
    Picture { picture: Arc<Picture> },
    /// Flat billboard for things without sprite lumps.
    Solid { color: u8, height: Fixed },
}

#[derive(Debug, Clone)]
struct VisSprite {
    x1: i32,
    x2: i32,
    gx: Fixed,
    gy: Fixed,
    /// Feet and top heights.
    gz: Fixed,
    gzt: Fixed,
    scale: Fixed,
    /// Texture columns per screen column; negative when mirrored.
    xiscale: Fixed,
    start_frac: Fixed,
    texture_mid: Fixed,
    light: i32,
    source: SpriteSource,
}

/// Per-frame working state.
#[derive(Debug, Clone)]
struct FrameState {
    planes: PlaneSet,
    /// Last row covered from the top, per column.
    ceiling_clip: Vec<i32>,
    /// First row covered from the bottom, per column.
    floor_clip: Vec<i32>,
    solid: Vec<bool>,
    solid_count: usize,
    draw_segs: Vec<DrawSeg>,
    vissprites: Vec<VisSprite>,
    sector_seen: Vec<bool>,
    /// (floor, ceiling) picnums per sector.
    sector_flats: Vec<(usize, usize)>,
    mobj_sectors: Vec<(usize, MobjId)>,
    stats: FrameStats,
}

impl FrameState {
    fn new(width: usize) -> Self {
        Self {
            planes: PlaneSet::new(width, None),
            ceiling_clip: Vec::new(),
            floor_clip: Vec::new(),
            solid: Vec::new(),
            solid_count: 0,
            draw_segs: Vec::new(),
            vissprites: Vec::new(),
            sector_seen: Vec::new(),
            sector_flats: Vec::new(),
            mobj_sectors: Vec::new(),
            stats: FrameStats::default(),
        }
    }

    fn begin(&mut self, tables: &RenderTables, scene: &Scene<'_>) {
        let (width, height) = (tables.width, tables.height as i32);
        let sky = scene.flats.sky_picnum().unwrap_or(MISSING_SKY);
        self.planes.clear(width);
        self.planes.set_sky_picnum(Some(sky));
        self.ceiling_clip.clear();
        self.ceiling_clip.resize(width, -1);
        self.floor_clip.clear();
        self.floor_clip.resize(width, height);
        self.solid.clear();
        self.solid.resize(width, false);
        self.solid_count = 0;
        self.draw_segs.clear();
        self.vissprites.clear();
        self.sector_seen.clear();
        self.sector_seen.resize(scene.map.sectors.len(), false);
        self.sector_flats = scene
            .map
            .sectors
            .iter()
            .map(|s| {
                (
                    flat_picnum(scene.flats, &s.floor_flat, sky),
                    flat_picnum(scene.flats, &s.ceiling_flat, sky),
                )
            })
            .collect();
        self.mobj_sectors = scene
            .mobjs
            .iter()
            .filter_map(|(id, m)| Some((scene.map.sector_index_at(m.x, m.y)?, id)))
            .collect();
        self.stats = FrameStats::default();
    }
}

fn flat_picnum(flats: &FlatStore, name: &str, sky: usize) -> usize {
    if name.eq_ignore_ascii_case(SKY_FLAT_NAME) {
        sky
    } else {
        flats.num_for_name(name).unwrap_or(NO_FLAT)
    }
}

/// The 3D view renderer. Owns the projection tables and per-frame buffers;
/// reuse one across frames.
#[derive(Debug, Clone)]
pub struct Renderer {
    tables: RenderTables,
    frame: FrameState,
    fallback_flat: Flat,
}

impl Renderer {
    pub fn new(width: usize, height: usize) -> Self {
        let tables = RenderTables::new(width, height);
        let frame = FrameState::new(tables.width);
        let pixels = (0..FLAT_BYTES)
            .map(|p| if (p % FLAT_SIZE / 16 + p / FLAT_SIZE / 16) % 2 == 0 { 80 } else { 88 })
            .collect();
        Self {
            tables,
            frame,
            fallback_flat: Flat {
                name: "-".to_string(),
                pixels,
            },
        }
    }

    /// Rebuild the tables for a new viewport size; a no-op when unchanged.
    pub fn resize(&mut self, width: usize, height: usize) {
        if self.tables.width == width.max(1) && self.tables.height == height.max(1) {
            return;
        }
        self.tables = RenderTables::new(width, height);
    }

    #[inline]
    pub fn tables(&self) -> &RenderTables {
        &self.tables
    }

    /// Visplanes of the last frame.
    pub fn planes(&self) -> &PlaneSet {
        &self.frame.planes
    }

    /// Draw the world as seen from `view`. The sink is expected to match the
    /// renderer size; the tables follow it when it does not.
    pub fn render<S: PixelSink + ?Sized>(
        &mut self,
        sink: &mut S,
        scene: &Scene<'_>,
        view: &View,
    ) -> FrameStats {
        self.resize(sink.width() as usize, sink.height() as usize);
        self.tables.update_flat_scales(view.angle);
        self.frame.begin(&self.tables, scene);

        let mut walker = FrameWalker {
            tables: &self.tables,
            frame: &mut self.frame,
            scene,
            view: *view,
            sink: &mut *sink,
            floor_plane: None,
            ceiling_plane: None,
        };
        bsp_walk(scene.map, view.x, view.y, &mut walker);

        self.draw_planes(sink, scene, view);
        self.draw_sprites(sink, scene);

        let stats = FrameStats {
            planes: self.frame.planes.len(),
            ..self.frame.stats
        };
        tracing::trace!(
            subsectors = stats.subsectors,
            walls = stats.wall_ranges,
            planes = stats.planes,
            sprites = stats.sprites,
            "frame rendered"
        );
        stats
    }

    fn draw_planes<S: PixelSink + ?Sized>(&self, sink: &mut S, scene: &Scene<'_>, view: &View) {
        let tables = &self.tables;
        let planes = &self.frame.planes;
        for plane in planes.iter().filter(|p| !p.is_empty()) {
            if planes.is_sky(plane.picnum) {
                self.draw_sky(sink, scene, view, plane.minx, plane.maxx, |x| plane.column(x));
                continue;
            }
            let flat = scene.flats.get(plane.picnum).unwrap_or(&self.fallback_flat);
            let plane_height = plane.height.saturating_sub(view.z).saturating_abs();
            plane.spans(tables.height, |y, x1, x2| {
                let (Some(&slope), Some(&dist_scale), Some(&col_angle)) = (
                    tables.y_slope.get(y as usize),
                    tables.dist_scale.get(x1 as usize),
                    tables.x_to_view_angle.get(x1 as usize),
                ) else {
                    return;
                };
                let distance = fixed_mul(plane_height, slope);
                let length = fixed_mul(distance, dist_scale);
                let fine = fine_index(view.angle.wrapping_add(col_angle));
                draw_span(
                    &mut *sink,
                    scene.palette,
                    &SpanDraw {
                        y,
                        x1,
                        x2,
                        xfrac: view.x.wrapping_add(fixed_mul(fine_cosine(fine), length)),
                        yfrac: view
                            .y
                            .wrapping_neg()
                            .wrapping_sub(fixed_mul(fine_sine(fine), length)),
                        xstep: fixed_mul(distance, tables.base_x_scale),
                        ystep: fixed_mul(distance, tables.base_y_scale),
                        flat,
                        light: tables.plane_light(plane.light_level, view.extra_light, distance),
                    },
                );
            });
        }
    }

    /// Sky columns are fullbright and fixed to the view direction, so the
    /// sky scrolls with turning but not with movement.
    fn draw_sky<S: PixelSink + ?Sized>(
        &self,
        sink: &mut S,
        scene: &Scene<'_>,
        view: &View,
        minx: i32,
        maxx: i32,
        column: impl Fn(i32) -> Option<(i32, i32)>,
    ) {
        let tables = &self.tables;
        let sky = scene.flats.sky_picnum().and_then(|p| scene.flats.get(p));
        let mut texels = [0u8; FLAT_SIZE];
        for x in minx..=maxx {
            let Some((top, bottom)) = column(x) else {
                continue;
            };
            let Some(flat) = sky else {
                fill_column(sink, x, top, bottom, scene.palette.color(SKY_FALLBACK_COLOR));
                continue;
            };
            let col_angle = tables.x_to_view_angle.get(x as usize).copied().unwrap_or(0);
            let u = (view.angle.wrapping_add(col_angle) >> ANGLETOSKYSHIFT) as i32;
            for (v, t) in texels.iter_mut().enumerate() {
                *t = flat.texel(u, v as i32);
            }
            draw_column(
                sink,
                scene.palette,
                &ColumnDraw {
                    x,
                    y_low: top,
                    y_high: bottom,
                    texture_mid: SKY_TEXTURE_MID,
                    iscale: tables.psprite_iscale,
                    center_y: tables.center_y,
                    source: &texels,
                    light: 0,
                },
            );
        }
    }

    fn draw_sprites<S: PixelSink + ?Sized>(&mut self, sink: &mut S, scene: &Scene<'_>) {
        let frame = &mut self.frame;
        frame.vissprites.sort_by_key(|v| v.scale);
        let height = self.tables.height as i32;
        for vis in &frame.vissprites {
            let (clip_top, clip_bottom) = sprite_clips(&frame.draw_segs, &scene.map.segs, vis, height);
            draw_vissprite(sink, scene.palette, &self.tables, vis, &clip_top, &clip_bottom);
        }
        frame.stats.sprites = frame.vissprites.len();
    }
}

/// Per-column rows a sprite may not draw into: `(top, bottom)` with the
/// sprite visible strictly between them, indexed from `vis.x1`.
fn sprite_clips(
    draw_segs: &[DrawSeg],
    segs: &[Seg],
    vis: &VisSprite,
    view_height: i32,
) -> (Vec<i32>, Vec<i32>) {
    const UNSET: i32 = -2;
    let n = (vis.x2 - vis.x1 + 1).max(0) as usize;
    let mut clip_top = vec![UNSET; n];
    let mut clip_bottom = vec![UNSET; n];

    // Later draw segs are farther away; the first one in front of the
    // sprite already carries the clipping of everything nearer.
    for ds in draw_segs.iter().rev() {
        if ds.x1 > vis.x2 || ds.x2 < vis.x1 || (ds.top.is_none() && ds.bottom.is_none()) {
            continue;
        }
        let (low, high) = if ds.scale1 > ds.scale2 {
            (ds.scale2, ds.scale1)
        } else {
            (ds.scale1, ds.scale2)
        };
        let sprite_in_front = segs
            .get(ds.seg)
            .is_some_and(|s| point_on_side(vis.gx, vis.gy, s.x1, s.y1, s.x2 - s.x1, s.y2 - s.y1) == FRONT);
        if high < vis.scale || (low < vis.scale && sprite_in_front) {
            continue;
        }

        let top = ds.top.as_ref().filter(|(h, _)| vis.gzt > *h);
        let bottom = ds.bottom.as_ref().filter(|(h, _)| vis.gz < *h);
        for x in ds.x1.max(vis.x1)..=ds.x2.min(vis.x2) {
            let i = (x - vis.x1) as usize;
            let j = (x - ds.x1) as usize;
            if let Some((_, rows)) = top
                && clip_top[i] == UNSET
            {
                clip_top[i] = rows.get(j).copied().unwrap_or(UNSET);
            }
            if let Some((_, rows)) = bottom
                && clip_bottom[i] == UNSET
            {
                clip_bottom[i] = rows.get(j).copied().unwrap_or(UNSET);
            }
        }
    }

    for t in &mut clip_top {
        if *t == UNSET {
            *t = -1;
        }
    }
    for b in &mut clip_bottom {
        if *b == UNSET {
            *b = view_height;
        }
    }
    (clip_top, clip_bottom)
}

fn draw_vissprite<S: PixelSink + ?Sized>(
    sink: &mut S,
    palette: &DoomPalette,
    tables: &RenderTables,
    vis: &VisSprite,
    clip_top: &[i32],
    clip_bottom: &[i32],
) {
    let sprite_top = tables
        .center_y_frac
        .saturating_sub(fixed_mul(vis.texture_mid, vis.scale));
    let mut frac = vis.start_frac;
    for x in vis.x1..=vis.x2 {
        let i = (x - vis.x1) as usize;
        let (top, bottom) = (clip_top[i] + 1, clip_bottom[i] - 1);
        match &vis.source {
            SpriteSource::Picture { picture } => {
                if let Some(posts) = picture.columns.get((frac >> FRACBITS).max(0) as usize) {
                    draw_masked_column(
                        sink,
                        palette,
                        &MaskedColumn {
                            x,
                            posts,
                            texture_mid: vis.texture_mid,
                            sprite_top,
                            scale: vis.scale,
                            iscale: vis.xiscale.saturating_abs(),
                            center_y: tables.center_y,
                            clip_top: top,
                            clip_bottom: bottom,
                            light: vis.light,
                        },
                    );
                }
            }
            SpriteSource::Solid { color, height } => {
                let bottom_screen = sprite_top.saturating_add(fixed_mul(*height, vis.scale));
                let y_low = (sprite_top.saturating_add(FRACUNIT - 1) >> FRACBITS).max(top);
                let y_high = ((bottom_screen - 1) >> FRACBITS).min(bottom);
                fill_column(sink, x, y_low, y_high, palette.rgba(vis.light, *color));
            }
        }
        frac = frac.wrapping_add(vis.xiscale);
    }
}

/// Project a thing into a vissprite, `None` when it is off screen.
fn project_sprite(
    tables: &RenderTables,
    scene: &Scene<'_>,
    view: &View,
    mobj: &Mobj,
    light_level: i32,
) -> Option<VisSprite> {
    let fine = fine_index(view.angle);
    let (view_cos, view_sin) = (fine_cosine(fine), fine_sine(fine));
    let tr_x = mobj.x.wrapping_sub(view.x);
    let tr_y = mobj.y.wrapping_sub(view.y);

    let tz = fixed_mul(tr_x, view_cos).saturating_add(fixed_mul(tr_y, view_sin));
    if tz < MINZ {
        return None;
    }
    let xscale = fixed_div(tables.projection, tz);
    let tx = fixed_mul(tr_y, view_cos).saturating_sub(fixed_mul(tr_x, view_sin)).saturating_neg();
    if tx.saturating_abs() > tz.saturating_mul(4) {
        return None;
    }

    let frame_index = (mobj.frame & FF_FRAMEMASK) as usize;
    let rotation = scene
        .sprites
        .frame(mobj.sprite.name(), frame_index)
        .and_then(|frame| {
            let to_thing = point_to_angle(view.x, view.y, mobj.x, mobj.y);
            frame.rotation(rotation_index(to_thing, mobj.angle))
        });

    let (left, width, top, flip, source) = match rotation {
        Some(rot) => {
            let pic = &rot.picture;
            (
                i32::from(pic.left_offset) << FRACBITS,
                (pic.width as i32) << FRACBITS,
                i32::from(pic.top_offset) << FRACBITS,
                rot.flip,
                SpriteSource::Picture {
                    picture: Arc::clone(pic),
                },
            )
        }
        None => (
            mobj.radius,
            mobj.radius.saturating_mul(2),
            mobj.height,
            false,
            SpriteSource::Solid {
                color: name_color(mobj.sprite.name()),
                height: mobj.height,
            },
        ),
    };

    let left_edge = tx.saturating_sub(left);
    let x1 = tables.center_x_frac.saturating_add(fixed_mul(left_edge, xscale)) >> FRACBITS;
    if x1 >= tables.width as i32 {
        return None;
    }
    let x2 = (tables
        .center_x_frac
        .saturating_add(fixed_mul(left_edge.saturating_add(width), xscale))
        >> FRACBITS)
        - 1;
    if x2 < 0 || x2 < x1 {
        return None;
    }

    let iscale = fixed_div(FRACUNIT, xscale);
    let (mut start_frac, xiscale) = if flip { (width - 1, -iscale) } else { (0, iscale) };
    let vis_x1 = x1.max(0);
    if vis_x1 > x1 {
        start_frac = start_frac.wrapping_add(xiscale.wrapping_mul(vis_x1 - x1));
    }
    let gzt = mobj.z.saturating_add(top);
    let light = if mobj.frame & FF_FULLBRIGHT != 0 {
        0
    } else {
        tables.wall_light(light_level, view.extra_light, xscale)
    };

    Some(VisSprite {
        x1: vis_x1,
        x2: x2.min(tables.width as i32 - 1),
        gx: mobj.x,
        gy: mobj.y,
        gz: mobj.z,
        gzt,
        scale: xscale,
        xiscale,
        start_frac,
        texture_mid: gzt.saturating_sub(view.z),
        light,
        source,
    })
}

/// BSP visitor carrying one frame's wall pass.
struct FrameWalker<'a, 's, S: ?Sized> {
    tables: &'a RenderTables,
    frame: &'a mut FrameState,
    scene: &'a Scene<'s>,
    view: View,
    sink: &'a mut S,
    floor_plane: Option<usize>,
    ceiling_plane: Option<usize>,
}

impl<S: PixelSink + ?Sized> BspVisitor for FrameWalker<'_, '_, S> {
    fn check_bbox(&mut self, bbox: &BoundingBox) -> bool {
        match bbox_span(self.tables, self.view.x, self.view.y, self.view.angle, bbox) {
            BoxSpan::Surrounds => true,
            BoxSpan::Hidden => false,
            BoxSpan::Columns(x1, x2) => {
                let last = self.frame.solid.len() as i32 - 1;
                (x1.max(0)..=x2.min(last)).any(|x| !self.frame.solid[x as usize])
            }
        }
    }

    fn visit_subsector(&mut self, index: usize) -> bool {
        let map = self.scene.map;
        let Some(ss) = map.subsectors.get(index) else {
            return true;
        };
        let Some(sector) = map.sectors.get(ss.sector) else {
            return true;
        };
        self.frame.stats.subsectors += 1;

        let (floor_pic, ceiling_pic) = self
            .frame
            .sector_flats
            .get(ss.sector)
            .copied()
            .unwrap_or((NO_FLAT, NO_FLAT));
        let light = sector.light_level;
        self.floor_plane = (sector.floor_height < self.view.z)
            .then(|| self.frame.planes.find_plane(sector.floor_height, floor_pic, light));
        self.ceiling_plane = (sector.ceiling_height > self.view.z
            || self.frame.planes.is_sky(ceiling_pic))
        .then(|| self.frame.planes.find_plane(sector.ceiling_height, ceiling_pic, light));

        if !self.frame.sector_seen[ss.sector] {
            self.frame.sector_seen[ss.sector] = true;
            self.add_sprites(ss.sector, light);
        }

        for seg in ss.first_seg..ss.first_seg + ss.num_segs {
            self.add_line(seg);
        }
        self.frame.solid_count < self.frame.solid.len()
    }
}

impl<S: PixelSink + ?Sized> FrameWalker<'_, '_, S> {
    fn add_sprites(&mut self, sector: usize, light_level: i32) {
        let ids: Vec<MobjId> = self
            .frame
            .mobj_sectors
            .iter()
            .filter(|(s, _)| *s == sector)
            .map(|&(_, id)| id)
            .collect();
        for id in ids {
            let Some(mobj) = self.scene.mobjs.get(id) else {
                continue;
            };
            if let Some(vis) = project_sprite(self.tables, self.scene, &self.view, mobj, light_level) {
                self.frame.vissprites.push(vis);
            }
        }
    }

    /// Clip a seg to the view and hand its open columns to the wall pass.
    fn add_line(&mut self, seg_index: usize) {
        let map = self.scene.map;
        let Some(seg) = map.segs.get(seg_index) else {
            return;
        };
        let view = self.view;
        let angle1 = point_to_angle(view.x, view.y, seg.x1, seg.y1);
        let angle2 = point_to_angle(view.x, view.y, seg.x2, seg.y2);
        let span = angle1.wrapping_sub(angle2);
        // Back side.
        if span >= ANG180 {
            return;
        }
        let rw_angle1 = angle1;
        let mut a1 = angle1.wrapping_sub(view.angle);
        let mut a2 = angle2.wrapping_sub(view.angle);

        let clip = self.tables.clip_angle;
        let fov = clip.wrapping_mul(2);
        let tspan = a1.wrapping_add(clip);
        if tspan > fov {
            if tspan - fov >= span {
                return;
            }
            a1 = clip;
        }
        let tspan = clip.wrapping_sub(a2);
        if tspan > fov {
            if tspan - fov >= span {
                return;
            }
            a2 = clip.wrapping_neg();
        }
        let x1 = self.tables.angle_to_x(a1);
        let x2 = self.tables.angle_to_x(a2);
        if x1 >= x2 {
            return;
        }

        let Some(front) = map.sectors.get(seg.front_sector) else {
            return;
        };
        let back = seg.back_sector.and_then(|b| map.sectors.get(b));
        let solid = match back {
            None => true,
            Some(b) => b.ceiling_height <= front.floor_height || b.floor_height >= front.ceiling_height,
        };
        if let Some(b) = back
            && !solid
            && self.same_surfaces(seg, b)
        {
            return;
        }

        let mut x = x1;
        while x < x2 {
            if self.frame.solid[x as usize] {
                x += 1;
                continue;
            }
            let start = x;
            while x < x2 && !self.frame.solid[x as usize] {
                x += 1;
            }
            self.store_wall_range(seg_index, front, back, start, x - 1, rw_angle1);
        }

        if solid {
            for col in &mut self.frame.solid[x1 as usize..x2 as usize] {
                if !*col {
                    *col = true;
                    self.frame.solid_count += 1;
                }
            }
        }
    }

    /// A two-sided line between sectors that look identical draws nothing.
    fn same_surfaces(&self, seg: &Seg, back: &Sector) -> bool {
        let Some(front) = self.scene.map.sectors.get(seg.front_sector) else {
            return false;
        };
        let flats = |s: usize| self.frame.sector_flats.get(s).copied();
        front.floor_height == back.floor_height
            && front.ceiling_height == back.ceiling_height
            && front.light_level == back.light_level
            && seg.back_sector.is_some_and(|b| flats(b) == flats(seg.front_sector))
    }

    fn is_sky_ceiling(&self, sector: Option<usize>) -> bool {
        sector
            .and_then(|s| self.frame.sector_flats.get(s))
            .is_some_and(|&(_, ceiling)| self.frame.planes.is_sky(ceiling))
    }

    /// Draw wall columns `start..=stop` of a seg and mark the planes above
    /// and below them.
    fn store_wall_range(
        &mut self,
        seg_index: usize,
        front: &Sector,
        back: Option<&Sector>,
        start: i32,
        stop: i32,
        rw_angle1: Angle,
    ) {
        let map = self.scene.map;
        let Some(seg) = map.segs.get(seg_index) else {
            return;
        };
        let tables = self.tables;
        let view = self.view;
        let height = tables.height as i32;
        self.frame.stats.wall_ranges += 1;

        let normal = seg.angle.wrapping_add(ANG90);
        let offset_angle = (normal.wrapping_sub(rw_angle1) as i32).unsigned_abs().min(ANG90);
        let hyp = point_distance(view.x, view.y, seg.x1, seg.y1);
        let distance = fixed_mul(hyp, fine_sine(fine_index(ANG90 - offset_angle)));

        let scale_at = |x: i32| {
            let angle = tables.x_to_view_angle.get(x as usize).copied().unwrap_or(0);
            tables.scale_from_global_angle(view.angle, view.angle.wrapping_add(angle), normal, distance)
        };
        let scale1 = scale_at(start);
        let scale2 = if stop > start { scale_at(stop) } else { scale1 };
        let scale_step = if stop > start {
            (scale2 - scale1) / (stop - start)
        } else {
            0
        };

        let (floor_pic, ceiling_pic) = self
            .frame
            .sector_flats
            .get(seg.front_sector)
            .copied()
            .unwrap_or((NO_FLAT, NO_FLAT));
        let mut world_top = front.ceiling_height.saturating_sub(view.z);
        let world_bottom = front.floor_height.saturating_sub(view.z);

        let line = map.lines.get(seg.linedef);
        let side = line.and_then(|l| map.side_of(l, seg.side));
        let extra = view.extra_light
            + if seg.y1 == seg.y2 {
                -1
            } else if seg.x1 == seg.x2 {
                1
            } else {
                0
            };

        let mut mark_floor = true;
        let mut mark_ceiling = true;
        let mut upper = None;
        let mut lower = None;
        let mut top_sil = None;
        let mut bottom_sil = None;
        let mut closed_top = false;
        let mut closed_bottom = false;

        match back {
            None => {
                top_sil = Some(MININT);
                bottom_sil = Some(MAXINT);
                closed_top = true;
                closed_bottom = true;
            }
            Some(back) => {
                let (back_floor_pic, back_ceiling_pic) = seg
                    .back_sector
                    .and_then(|b| self.frame.sector_flats.get(b).copied())
                    .unwrap_or((NO_FLAT, NO_FLAT));
                if front.floor_height > back.floor_height {
                    bottom_sil = Some(front.floor_height);
                } else if back.floor_height > view.z {
                    bottom_sil = Some(MAXINT);
                }
                if front.ceiling_height < back.ceiling_height {
                    top_sil = Some(front.ceiling_height);
                } else if back.ceiling_height < view.z {
                    top_sil = Some(MININT);
                }
                if back.ceiling_height <= front.floor_height {
                    bottom_sil = Some(MAXINT);
                    closed_bottom = true;
                }
                if back.floor_height >= front.ceiling_height {
                    top_sil = Some(MININT);
                    closed_top = true;
                }

                let world_high = back.ceiling_height.saturating_sub(view.z);
                let world_low = back.floor_height.saturating_sub(view.z);
                // Sky hack: no upper wall between two sky ceilings.
                if self.is_sky_ceiling(Some(seg.front_sector)) && self.is_sky_ceiling(seg.back_sector) {
                    world_top = world_high;
                }

                mark_floor = world_low != world_bottom
                    || back_floor_pic != floor_pic
                    || back.light_level != front.light_level;
                mark_ceiling = world_high != world_top
                    || back_ceiling_pic != ceiling_pic
                    || back.light_level != front.light_level;
                if back.ceiling_height <= front.floor_height || back.floor_height >= front.ceiling_height {
                    mark_floor = true;
                    mark_ceiling = true;
                }
                if world_high < world_top {
                    upper = Some(world_high >> 4);
                }
                if world_low > world_bottom {
                    lower = Some(world_low >> 4);
                }
            }
        }

        if front.floor_height >= view.z {
            mark_floor = false;
        }
        if front.ceiling_height <= view.z && !self.frame.planes.is_sky(ceiling_pic) {
            mark_ceiling = false;
        }

        let world_top = world_top >> 4;
        let world_bottom = world_bottom >> 4;
        let center = tables.center_y_frac >> 4;
        let mut scale = scale1;
        let mut top_frac = center.saturating_sub(fixed_mul(world_top, scale));
        let top_step = fixed_mul(scale_step, world_top).saturating_neg();
        let mut bottom_frac = center.saturating_sub(fixed_mul(world_bottom, scale));
        let bottom_step = fixed_mul(scale_step, world_bottom).saturating_neg();
        let mut pix_high = upper.map(|h| center.saturating_sub(fixed_mul(h, scale)));
        let pix_high_step = upper.map_or(0, |h| fixed_mul(scale_step, h).saturating_neg());
        let mut pix_low = lower.map(|l| center.saturating_sub(fixed_mul(l, scale)));
        let pix_low_step = lower.map_or(0, |l| fixed_mul(scale_step, l).saturating_neg());

        if mark_ceiling && let Some(p) = self.ceiling_plane {
            self.ceiling_plane = Some(self.frame.planes.check_plane(p, start, stop));
        }
        if mark_floor && let Some(p) = self.floor_plane {
            self.floor_plane = Some(self.frame.planes.check_plane(p, start, stop));
        }

        let (mid_color, top_color, bottom_color) = match side {
            Some(s) => (
                name_color(&s.mid_texture),
                name_color(&s.top_texture),
                name_color(&s.bottom_texture),
            ),
            None => {
                let c = name_color("-");
                (c, c, c)
            }
        };
        let palette = self.scene.palette;

        for x in start..=stop {
            let col = x as usize;
            let ceil_clip = self.frame.ceiling_clip[col];
            let floor_clip = self.frame.floor_clip[col];
            let light = tables.wall_light(front.light_level, extra, scale);

            let yl = (top_frac.saturating_add(HEIGHTUNIT - 1) >> HEIGHTBITS).max(ceil_clip + 1);
            if mark_ceiling && let Some(p) = self.ceiling_plane {
                let bottom = (yl - 1).min(floor_clip - 1);
                self.frame.planes.set_plane_column(p, x, ceil_clip + 1, bottom);
            }
            let yh = (bottom_frac >> HEIGHTBITS).min(floor_clip - 1);
            if mark_floor && let Some(p) = self.floor_plane {
                let top = (yh + 1).max(ceil_clip + 1);
                self.frame.planes.set_plane_column(p, x, top, floor_clip - 1);
            }

            if back.is_none() {
                fill_column(&mut *self.sink, x, yl, yh, palette.rgba(light, mid_color));
                self.frame.ceiling_clip[col] = height;
                self.frame.floor_clip[col] = -1;
            } else {
                if let Some(ph) = pix_high.as_mut() {
                    let mid = (*ph >> HEIGHTBITS).min(floor_clip - 1);
                    *ph = ph.saturating_add(pix_high_step);
                    if mid >= yl {
                        fill_column(&mut *self.sink, x, yl, mid, palette.rgba(light, top_color));
                        self.frame.ceiling_clip[col] = mid;
                    } else {
                        self.frame.ceiling_clip[col] = yl - 1;
                    }
                } else if mark_ceiling {
                    self.frame.ceiling_clip[col] = yl - 1;
                }

                if let Some(pl) = pix_low.as_mut() {
                    let mid = (pl.saturating_add(HEIGHTUNIT - 1) >> HEIGHTBITS)
                        .max(self.frame.ceiling_clip[col] + 1);
                    *pl = pl.saturating_add(pix_low_step);
                    if mid <= yh {
                        fill_column(&mut *self.sink, x, mid, yh, palette.rgba(light, bottom_color));
                        self.frame.floor_clip[col] = mid;
                    } else {
                        self.frame.floor_clip[col] = yh + 1;
                    }
                } else if mark_floor {
                    self.frame.floor_clip[col] = yh + 1;
                }
            }

            scale = scale.saturating_add(scale_step);
            top_frac = top_frac.saturating_add(top_step);
            bottom_frac = bottom_frac.saturating_add(bottom_step);
        }

        let range = start as usize..=stop as usize;
        let width = stop - start + 1;
        let top = top_sil.map(|h| {
            let rows = if closed_top {
                vec![height; width as usize]
            } else {
                self.frame.ceiling_clip[range.clone()].to_vec()
            };
            (h, rows)
        });
        let bottom = bottom_sil.map(|h| {
            let rows = if closed_bottom {
                vec![-1; width as usize]
            } else {
                self.frame.floor_clip[range.clone()].to_vec()
            };
            (h, rows)
        });
        if top.is_some() || bottom.is_some() {
            self.frame.draw_segs.push(DrawSeg {
                seg: seg_index,
                x1: start,
                x2: stop,
                scale1,
                scale2,
                top,
                bottom,
            });
        }
    }
}
