/// Easing of the segment that starts at a keyframe.
///
/// Bezier control points are normalized to the segment: `(0, 0)` is the keyframe and `(1, 1)` the
/// next one.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Copy, Clone, Debug, PartialEq, Default)]
pub enum Curve {
    #[default]
    Linear,
    Stepped,
    Bezier {
        cx1: f32,
        cy1: f32,
        cx2: f32,
        cy2: f32,
    },
}

impl Curve {
    /// Eased progress for a linear progress `percent` in `[0, 1]` (clamped).
    ///
    /// Bezier curves are evaluated piecewise-linearly over nine forward-differenced samples.
    pub fn percent(&self, percent: f32) -> f32 {
        let percent = percent.clamp(0.0, 1.0);
        match *self {
            Curve::Linear => percent,
            Curve::Stepped => 0.0,
            Curve::Bezier { cx1, cy1, cx2, cy2 } => bezier_percent(percent, cx1, cy1, cx2, cy2),
        }
    }
}

fn bezier_percent(percent: f32, cx1: f32, cy1: f32, cx2: f32, cy2: f32) -> f32 {
    const BEZIER_SIZE: usize = 18;

    let tmpx = (-cx1 * 2.0 + cx2) * 0.03;
    let tmpy = (-cy1 * 2.0 + cy2) * 0.03;
    let dddx = ((cx1 - cx2) * 3.0 + 1.0) * 0.006;
    let dddy = ((cy1 - cy2) * 3.0 + 1.0) * 0.006;
    let mut ddx = tmpx * 2.0 + dddx;
    let mut ddy = tmpy * 2.0 + dddy;
    let mut dx = cx1 * 0.3 + tmpx + dddx * 0.16666667;
    let mut dy = cy1 * 0.3 + tmpy + dddy * 0.16666667;

    let mut x = dx;
    let mut y = dy;

    let mut points = [0.0f32; BEZIER_SIZE];
    for i in (0..BEZIER_SIZE).step_by(2) {
        points[i] = x;
        points[i + 1] = y;
        dx += ddx;
        dy += ddy;
        ddx += dddx;
        ddy += dddy;
        x += dx;
        y += dy;
    }

    let mut prev = (0.0f32, 0.0f32);
    for i in (0..BEZIER_SIZE).step_by(2) {
        let (x, y) = (points[i], points[i + 1]);
        if x >= percent {
            let denom = x - prev.0;
            if denom.abs() <= 1.0e-12 {
                return prev.1;
            }
            return prev.1 + (y - prev.1) * (percent - prev.0) / denom;
        }
        prev = (x, y);
    }

    let (x, y) = prev;
    let denom = 1.0 - x;
    if denom.abs() <= 1.0e-12 {
        return y;
    }
    y + (1.0 - y) * (percent - x) / denom
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug)]
pub struct AttachmentFrame {
    pub time: f32,
    pub name: Option<String>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug)]
pub struct ColorFrame {
    pub time: f32,
    pub color: [f32; 4],
    pub curve: Curve,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug)]
pub struct TwoColorFrame {
    pub time: f32,
    pub light: [f32; 4],
    pub dark: [f32; 3],
    pub curve: Curve,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug)]
pub struct RotateFrame {
    pub time: f32,
    pub angle: f32,
    pub curve: Curve,
}

/// Translate, scale or shear key.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug)]
pub struct Vec2Frame {
    pub time: f32,
    pub x: f32,
    pub y: f32,
    pub curve: Curve,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug)]
pub struct IkFrame {
    pub time: f32,
    pub mix: f32,
    pub bend_direction: i32,
    pub curve: Curve,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug)]
pub struct TransformFrame {
    pub time: f32,
    pub rotate_mix: f32,
    pub translate_mix: f32,
    pub scale_mix: f32,
    pub shear_mix: f32,
    pub curve: Curve,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug)]
pub struct FloatFrame {
    pub time: f32,
    pub value: f32,
    pub curve: Curve,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug)]
pub struct PathMixFrame {
    pub time: f32,
    pub rotate_mix: f32,
    pub translate_mix: f32,
    pub curve: Curve,
}

/// Fully materialized deform key: `deform_length` floats, absolute for unweighted geometry and
/// offsets for weighted geometry.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug)]
pub struct DeformFrame {
    pub time: f32,
    pub vertices: Vec<f32>,
    pub curve: Curve,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug)]
pub struct DrawOrderFrame {
    pub time: f32,
    /// `draw_order[i]` is the setup index of the slot drawn at position `i`.
    pub draw_order: Vec<usize>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug)]
pub struct Event {
    pub time: f32,
    /// Index into `SkeletonData::events`.
    pub data_index: usize,
    pub int_value: i32,
    pub float_value: f32,
    pub string: Option<String>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug)]
pub struct AttachmentTimeline {
    pub slot_index: usize,
    pub frames: Vec<AttachmentFrame>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug)]
pub struct ColorTimeline {
    pub slot_index: usize,
    pub frames: Vec<ColorFrame>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug)]
pub struct TwoColorTimeline {
    pub slot_index: usize,
    pub frames: Vec<TwoColorFrame>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug)]
pub struct RotateTimeline {
    pub bone_index: usize,
    pub frames: Vec<RotateFrame>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug)]
pub struct Vec2Timeline {
    pub bone_index: usize,
    pub frames: Vec<Vec2Frame>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug)]
pub struct IkConstraintTimeline {
    pub constraint_index: usize,
    pub frames: Vec<IkFrame>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug)]
pub struct TransformConstraintTimeline {
    pub constraint_index: usize,
    pub frames: Vec<TransformFrame>,
}

/// Path constraint position or spacing.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug)]
pub struct PathConstraintValueTimeline {
    pub constraint_index: usize,
    pub frames: Vec<FloatFrame>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug)]
pub struct PathConstraintMixTimeline {
    pub constraint_index: usize,
    pub frames: Vec<PathMixFrame>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug)]
pub struct DeformTimeline {
    pub skin_index: usize,
    pub slot_index: usize,
    /// Key of the deformed attachment within the skin.
    pub attachment: String,
    pub frames: Vec<DeformFrame>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug)]
pub struct DrawOrderTimeline {
    pub frames: Vec<DrawOrderFrame>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug)]
pub struct EventTimeline {
    pub events: Vec<Event>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug)]
pub enum Timeline {
    Attachment(AttachmentTimeline),
    Color(ColorTimeline),
    TwoColor(TwoColorTimeline),
    Rotate(RotateTimeline),
    Translate(Vec2Timeline),
    Scale(Vec2Timeline),
    Shear(Vec2Timeline),
    IkConstraint(IkConstraintTimeline),
    TransformConstraint(TransformConstraintTimeline),
    PathConstraintPosition(PathConstraintValueTimeline),
    PathConstraintSpacing(PathConstraintValueTimeline),
    PathConstraintMix(PathConstraintMixTimeline),
    Deform(DeformTimeline),
    DrawOrder(DrawOrderTimeline),
    Event(EventTimeline),
}

macro_rules! frame_times {
    ($self:expr, |$frames:ident| $body:expr) => {
        match $self {
            Timeline::Attachment(t) => { let $frames = &t.frames; $body }
            Timeline::Color(t) => { let $frames = &t.frames; $body }
            Timeline::TwoColor(t) => { let $frames = &t.frames; $body }
            Timeline::Rotate(t) => { let $frames = &t.frames; $body }
            Timeline::Translate(t) | Timeline::Scale(t) | Timeline::Shear(t) => {
                let $frames = &t.frames;
                $body
            }
            Timeline::IkConstraint(t) => { let $frames = &t.frames; $body }
            Timeline::TransformConstraint(t) => { let $frames = &t.frames; $body }
            Timeline::PathConstraintPosition(t) | Timeline::PathConstraintSpacing(t) => {
                let $frames = &t.frames;
                $body
            }
            Timeline::PathConstraintMix(t) => { let $frames = &t.frames; $body }
            Timeline::Deform(t) => { let $frames = &t.frames; $body }
            Timeline::DrawOrder(t) => { let $frames = &t.frames; $body }
            Timeline::Event(t) => { let $frames = &t.events; $body }
        }
    };
}

impl Timeline {
    pub fn frame_count(&self) -> usize {
        frame_times!(self, |frames| frames.len())
    }

    /// Time of the last keyframe, `0` for an empty timeline.
    pub fn duration(&self) -> f32 {
        frame_times!(self, |frames| frames.last().map(|f| f.time).unwrap_or(0.0))
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug)]
pub struct Animation {
    pub name: String,
    pub duration: f32,
    pub timelines: Vec<Timeline>,
}

impl Animation {
    /// Builds an animation whose duration is the latest last-keyframe time across `timelines`.
    pub fn new(name: impl Into<String>, timelines: Vec<Timeline>) -> Self {
        let duration = timelines
            .iter()
            .map(Timeline::duration)
            .fold(0.0f32, f32::max);
        Self {
            name: name.into(),
            duration,
            timelines,
        }
    }
}
