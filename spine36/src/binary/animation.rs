use super::{BinaryInput, read_index, read_name};
use crate::Error;
use crate::animation::{
    Animation, AttachmentFrame, AttachmentTimeline, ColorFrame, ColorTimeline, Curve, DeformFrame,
    DeformTimeline, DrawOrderFrame, DrawOrderTimeline, Event, EventTimeline, FloatFrame, IkFrame,
    IkConstraintTimeline, PathConstraintMixTimeline, PathConstraintValueTimeline, PathMixFrame,
    RotateFrame, RotateTimeline, Timeline, TransformConstraintTimeline, TransformFrame,
    TwoColorFrame, TwoColorTimeline, Vec2Frame, Vec2Timeline,
};
use crate::attachment::VertexData;
use crate::model::{EventData, PathConstraintData, SkeletonData, Skin};

const SLOT_ATTACHMENT: i8 = 0;
const SLOT_COLOR: i8 = 1;
const SLOT_TWO_COLOR: i8 = 2;

const BONE_ROTATE: i8 = 0;
const BONE_TRANSLATE: i8 = 1;
const BONE_SCALE: i8 = 2;
const BONE_SHEAR: i8 = 3;

const PATH_POSITION: i8 = 0;
const PATH_SPACING: i8 = 1;
const PATH_MIX: i8 = 2;

const CURVE_STEPPED: i8 = 1;
const CURVE_BEZIER: i8 = 2;

/// Frames whose segment to the next frame can be eased.
trait CurveFrame {
    fn curve_mut(&mut self) -> &mut Curve;
}

macro_rules! impl_curve_frame {
    ($($frame:ty),* $(,)?) => {
        $(impl CurveFrame for $frame {
            fn curve_mut(&mut self) -> &mut Curve {
                &mut self.curve
            }
        })*
    };
}

impl_curve_frame!(
    ColorFrame,
    TwoColorFrame,
    RotateFrame,
    Vec2Frame,
    IkFrame,
    TransformFrame,
    FloatFrame,
    PathMixFrame,
    DeformFrame,
);

/// Unknown curve types carry no payload and leave the segment linear.
fn read_curve(input: &mut BinaryInput<'_>) -> Result<Curve, Error> {
    match input.read_byte()? {
        CURVE_STEPPED => Ok(Curve::Stepped),
        CURVE_BEZIER => Ok(Curve::Bezier {
            cx1: input.read_f32()?,
            cy1: input.read_f32()?,
            cx2: input.read_f32()?,
            cy2: input.read_f32()?,
        }),
        _ => Ok(Curve::Linear),
    }
}

/// Reads `frame_count` frames, with a curve between consecutive frames (never after the last).
fn read_curved_frames<'a, F: CurveFrame>(
    input: &mut BinaryInput<'a>,
    frame_count: usize,
    mut read_frame: impl FnMut(&mut BinaryInput<'a>) -> Result<F, Error>,
) -> Result<Vec<F>, Error> {
    let mut frames = Vec::with_capacity(frame_count.min(input.remaining()));
    for frame_index in 0..frame_count {
        let mut frame = read_frame(input)?;
        if frame_index + 1 < frame_count {
            *frame.curve_mut() = read_curve(input)?;
        }
        frames.push(frame);
    }
    Ok(frames)
}

pub(super) fn read_animation(
    input: &mut BinaryInput<'_>,
    name: String,
    data: &SkeletonData,
    scale: f32,
) -> Result<Animation, Error> {
    let start = input.position();
    let mut timelines = Vec::new();

    read_slot_timelines(input, data.slots.len(), &mut timelines)?;
    read_bone_timelines(input, data.bones.len(), scale, &mut timelines)?;
    read_ik_timelines(input, data.ik_constraints.len(), &mut timelines)?;
    read_transform_timelines(input, data.transform_constraints.len(), &mut timelines)?;
    read_path_timelines(input, &data.path_constraints, scale, &mut timelines)?;
    read_deform_timelines(input, &data.skins, data.slots.len(), scale, &mut timelines)?;
    if let Some(timeline) = read_draw_order_timeline(input, data.slots.len())? {
        timelines.push(Timeline::DrawOrder(timeline));
    }
    if let Some(timeline) = read_event_timeline(input, &data.events)? {
        timelines.push(Timeline::Event(timeline));
    }

    let animation = Animation::new(name, timelines);
    tracing::trace!(
        animation = %animation.name,
        timelines = animation.timelines.len(),
        duration = animation.duration,
        start,
        end = input.position(),
        "read animation"
    );
    Ok(animation)
}

fn read_slot_timelines(
    input: &mut BinaryInput<'_>,
    slot_count: usize,
    timelines: &mut Vec<Timeline>,
) -> Result<(), Error> {
    for _ in 0..input.read_count()? {
        let slot_index = read_index(input, "slot", slot_count)?;
        for _ in 0..input.read_count()? {
            let kind = input.read_byte()?;
            let frame_count = input.read_count()?;
            match kind {
                SLOT_ATTACHMENT => {
                    let mut frames = Vec::with_capacity(frame_count.min(input.remaining()));
                    for _ in 0..frame_count {
                        frames.push(AttachmentFrame {
                            time: input.read_f32()?,
                            name: input.read_string()?,
                        });
                    }
                    timelines.push(Timeline::Attachment(AttachmentTimeline { slot_index, frames }));
                }
                SLOT_COLOR => {
                    let frames = read_curved_frames(input, frame_count, |input| {
                        Ok(ColorFrame {
                            time: input.read_f32()?,
                            color: input.read_color_rgba()?,
                            curve: Curve::Linear,
                        })
                    })?;
                    timelines.push(Timeline::Color(ColorTimeline { slot_index, frames }));
                }
                SLOT_TWO_COLOR => {
                    let frames = read_curved_frames(input, frame_count, |input| {
                        Ok(TwoColorFrame {
                            time: input.read_f32()?,
                            light: input.read_color_rgba()?,
                            dark: input.read_color_rgb()?,
                            curve: Curve::Linear,
                        })
                    })?;
                    timelines.push(Timeline::TwoColor(TwoColorTimeline { slot_index, frames }));
                }
                other => {
                    return Err(Error::parse(format!(
                        "unknown slot timeline type {other} (slot {slot_index})"
                    )));
                }
            }
        }
    }
    Ok(())
}

fn read_bone_timelines(
    input: &mut BinaryInput<'_>,
    bone_count: usize,
    scale: f32,
    timelines: &mut Vec<Timeline>,
) -> Result<(), Error> {
    for _ in 0..input.read_count()? {
        let bone_index = read_index(input, "bone", bone_count)?;
        for _ in 0..input.read_count()? {
            let kind = input.read_byte()?;
            let frame_count = input.read_count()?;
            match kind {
                BONE_ROTATE => {
                    let frames = read_curved_frames(input, frame_count, |input| {
                        Ok(RotateFrame {
                            time: input.read_f32()?,
                            angle: input.read_f32()?,
                            curve: Curve::Linear,
                        })
                    })?;
                    timelines.push(Timeline::Rotate(RotateTimeline { bone_index, frames }));
                }
                BONE_TRANSLATE | BONE_SCALE | BONE_SHEAR => {
                    let value_scale = if kind == BONE_TRANSLATE { scale } else { 1.0 };
                    let frames = read_curved_frames(input, frame_count, |input| {
                        Ok(Vec2Frame {
                            time: input.read_f32()?,
                            x: input.read_f32()? * value_scale,
                            y: input.read_f32()? * value_scale,
                            curve: Curve::Linear,
                        })
                    })?;
                    let timeline = Vec2Timeline { bone_index, frames };
                    timelines.push(match kind {
                        BONE_TRANSLATE => Timeline::Translate(timeline),
                        BONE_SCALE => Timeline::Scale(timeline),
                        _ => Timeline::Shear(timeline),
                    });
                }
                other => {
                    return Err(Error::parse(format!(
                        "unknown bone timeline type {other} (bone {bone_index})"
                    )));
                }
            }
        }
    }
    Ok(())
}

fn read_ik_timelines(
    input: &mut BinaryInput<'_>,
    constraint_count: usize,
    timelines: &mut Vec<Timeline>,
) -> Result<(), Error> {
    for _ in 0..input.read_count()? {
        let constraint_index = read_index(input, "ik constraint", constraint_count)?;
        let frame_count = input.read_count()?;
        let frames = read_curved_frames(input, frame_count, |input| {
            Ok(IkFrame {
                time: input.read_f32()?,
                mix: input.read_f32()?,
                bend_direction: input.read_byte()? as i32,
                curve: Curve::Linear,
            })
        })?;
        timelines.push(Timeline::IkConstraint(IkConstraintTimeline {
            constraint_index,
            frames,
        }));
    }
    Ok(())
}

fn read_transform_timelines(
    input: &mut BinaryInput<'_>,
    constraint_count: usize,
    timelines: &mut Vec<Timeline>,
) -> Result<(), Error> {
    for _ in 0..input.read_count()? {
        let constraint_index = read_index(input, "transform constraint", constraint_count)?;
        let frame_count = input.read_count()?;
        let frames = read_curved_frames(input, frame_count, |input| {
            Ok(TransformFrame {
                time: input.read_f32()?,
                rotate_mix: input.read_f32()?,
                translate_mix: input.read_f32()?,
                scale_mix: input.read_f32()?,
                shear_mix: input.read_f32()?,
                curve: Curve::Linear,
            })
        })?;
        timelines.push(Timeline::TransformConstraint(TransformConstraintTimeline {
            constraint_index,
            frames,
        }));
    }
    Ok(())
}

fn read_path_timelines(
    input: &mut BinaryInput<'_>,
    constraints: &[PathConstraintData],
    scale: f32,
    timelines: &mut Vec<Timeline>,
) -> Result<(), Error> {
    for _ in 0..input.read_count()? {
        let constraint_index = read_index(input, "path constraint", constraints.len())?;
        let constraint = &constraints[constraint_index];
        for _ in 0..input.read_count()? {
            let kind = input.read_byte()?;
            let frame_count = input.read_count()?;
            match kind {
                PATH_POSITION | PATH_SPACING => {
                    let spatial = if kind == PATH_SPACING {
                        constraint.spacing_is_spatial()
                    } else {
                        constraint.position_is_spatial()
                    };
                    let value_scale = if spatial { scale } else { 1.0 };
                    let frames = read_curved_frames(input, frame_count, |input| {
                        Ok(FloatFrame {
                            time: input.read_f32()?,
                            value: input.read_f32()? * value_scale,
                            curve: Curve::Linear,
                        })
                    })?;
                    let timeline = PathConstraintValueTimeline {
                        constraint_index,
                        frames,
                    };
                    timelines.push(if kind == PATH_SPACING {
                        Timeline::PathConstraintSpacing(timeline)
                    } else {
                        Timeline::PathConstraintPosition(timeline)
                    });
                }
                PATH_MIX => {
                    let frames = read_curved_frames(input, frame_count, |input| {
                        Ok(PathMixFrame {
                            time: input.read_f32()?,
                            rotate_mix: input.read_f32()?,
                            translate_mix: input.read_f32()?,
                            curve: Curve::Linear,
                        })
                    })?;
                    timelines.push(Timeline::PathConstraintMix(PathConstraintMixTimeline {
                        constraint_index,
                        frames,
                    }));
                }
                other => {
                    return Err(Error::parse(format!(
                        "unknown path constraint timeline type {other} ('{}')",
                        constraint.name
                    )));
                }
            }
        }
    }
    Ok(())
}

fn read_deform_timelines(
    input: &mut BinaryInput<'_>,
    skins: &[Skin],
    slot_count: usize,
    scale: f32,
    timelines: &mut Vec<Timeline>,
) -> Result<(), Error> {
    for _ in 0..input.read_count()? {
        let skin_index = read_index(input, "skin", skins.len())?;
        let skin = &skins[skin_index];
        for _ in 0..input.read_count()? {
            let slot_index = read_index(input, "slot", slot_count)?;
            for _ in 0..input.read_count()? {
                let key = read_name(input, "deform attachment")?;
                let Some(attachment) = skin.attachment(slot_index, &key) else {
                    // The loader skipped this attachment; its frames are still in the stream.
                    tracing::warn!(
                        skin = %skin.name,
                        slot = slot_index,
                        attachment = %key,
                        "deform timeline targets a skipped attachment, ignoring it"
                    );
                    let frame_count = input.read_count()?;
                    skip_deform_frames(input, frame_count)?;
                    continue;
                };
                let setup = attachment.vertex_data().ok_or_else(|| {
                    Error::parse(format!(
                        "deform timeline targets '{key}' (skin '{}', slot {slot_index}), which has no vertices",
                        skin.name
                    ))
                })?;
                let frame_count = read_deform_frame_count(input)?;
                let frames = read_curved_frames(input, frame_count, |input| {
                    Ok(DeformFrame {
                        time: input.read_f32()?,
                        vertices: read_deform_vertices(input, setup, scale)?,
                        curve: Curve::Linear,
                    })
                })?;
                timelines.push(Timeline::Deform(DeformTimeline {
                    skin_index,
                    slot_index,
                    attachment: key,
                    frames,
                }));
            }
        }
    }
    Ok(())
}

/// Smallest encoded deform frame: a time and an empty range.
const MIN_DEFORM_FRAME_BYTES: usize = 5;

/// Deform frame count, rejected up front when the rest of the input cannot hold that many frames.
fn read_deform_frame_count(input: &mut BinaryInput<'_>) -> Result<usize, Error> {
    let frame_count = input.read_count()?;
    let remaining = input.remaining();
    if frame_count > remaining / MIN_DEFORM_FRAME_BYTES {
        return Err(Error::TruncatedInput {
            offset: input.position(),
            needed: frame_count.saturating_mul(MIN_DEFORM_FRAME_BYTES),
            remaining,
        });
    }
    Ok(frame_count)
}

/// Materializes one deform key over the setup vertices.
///
/// The stream stores only the changed range `[start, start + end)`; everything else is the setup
/// value for unweighted geometry and zero for weighted geometry, whose keys are offsets. Every
/// frame allocates `deform_length` values, even an empty one, so the frame count is bounded by
/// [`read_deform_frame_count`].
fn read_deform_vertices(
    input: &mut BinaryInput<'_>,
    setup: &VertexData,
    scale: f32,
) -> Result<Vec<f32>, Error> {
    let weighted = setup.is_weighted();
    let deform_length = setup.deform_length();
    let end = input.read_count()?;
    if end == 0 {
        return Ok(if weighted {
            vec![0.0; deform_length]
        } else {
            setup.vertices.clone()
        });
    }

    let start = input.read_count()?;
    let stop = start
        .checked_add(end)
        .filter(|&stop| stop <= deform_length)
        .ok_or_else(|| {
            Error::parse(format!(
                "deform range {start}+{end} exceeds {deform_length} vertex values"
            ))
        })?;
    let mut deform = vec![0.0f32; deform_length];
    for value in &mut deform[start..stop] {
        *value = input.read_f32()? * scale;
    }
    if !weighted {
        for (value, setup) in deform.iter_mut().zip(&setup.vertices) {
            *value += setup;
        }
    }
    Ok(deform)
}

fn skip_deform_frames(input: &mut BinaryInput<'_>, frame_count: usize) -> Result<(), Error> {
    for frame_index in 0..frame_count {
        let _time = input.read_f32()?;
        let end = input.read_count()?;
        if end != 0 {
            let _start = input.read_count()?;
            for _ in 0..end {
                input.read_f32()?;
            }
        }
        if frame_index + 1 < frame_count {
            read_curve(input)?;
        }
    }
    Ok(())
}

fn read_draw_order_timeline(
    input: &mut BinaryInput<'_>,
    slot_count: usize,
) -> Result<Option<DrawOrderTimeline>, Error> {
    let count = input.read_count()?;
    if count == 0 {
        return Ok(None);
    }
    let mut frames = Vec::with_capacity(count.min(input.remaining()));
    for _ in 0..count {
        let time = input.read_f32()?;
        let offset_count = input.read_count()?;
        let mut offsets = Vec::with_capacity(offset_count.min(input.remaining()));
        for _ in 0..offset_count {
            let slot_index = input.read_count()?;
            let offset = input.read_varint(true)?;
            offsets.push((slot_index, offset));
        }
        frames.push(DrawOrderFrame {
            time,
            draw_order: draw_order_permutation(slot_count, &offsets)?,
        });
    }
    Ok(Some(DrawOrderTimeline { frames }))
}

/// Rebuilds a full draw order from `(slot index, offset)` pairs in ascending slot order.
///
/// Moved slots are placed at `slot + offset`; the remaining slots keep their relative order and
/// fill the free positions.
fn draw_order_permutation(slot_count: usize, offsets: &[(usize, i32)]) -> Result<Vec<usize>, Error> {
    if offsets.len() > slot_count {
        return Err(Error::parse(format!(
            "draw order moves {} slots but there are only {slot_count}",
            offsets.len()
        )));
    }
    let mut draw_order: Vec<Option<usize>> = vec![None; slot_count];
    let mut unchanged = Vec::with_capacity(slot_count - offsets.len());
    let mut original_index = 0usize;
    for &(slot_index, offset) in offsets {
        if slot_index < original_index || slot_index >= slot_count {
            return Err(Error::parse(format!(
                "draw order slot {slot_index} is out of order or out of range ({slot_count} slots)"
            )));
        }
        while original_index != slot_index {
            unchanged.push(original_index);
            original_index += 1;
        }
        let target = usize::try_from(original_index as i64 + offset as i64)
            .ok()
            .filter(|&target| target < slot_count)
            .ok_or_else(|| {
                Error::parse(format!(
                    "draw order moves slot {slot_index} by {offset}, outside {slot_count} slots"
                ))
            })?;
        if draw_order[target].is_some() {
            return Err(Error::parse(format!(
                "draw order position {target} is assigned twice"
            )));
        }
        draw_order[target] = Some(original_index);
        original_index += 1;
    }
    unchanged.extend(original_index..slot_count);
    for position in draw_order.iter_mut().rev() {
        if position.is_none() {
            *position = unchanged.pop();
        }
    }
    draw_order
        .into_iter()
        .map(|position| position.ok_or_else(|| Error::parse("draw order is not a permutation")))
        .collect()
}

fn read_event_timeline(
    input: &mut BinaryInput<'_>,
    event_data: &[EventData],
) -> Result<Option<EventTimeline>, Error> {
    let count = input.read_count()?;
    if count == 0 {
        return Ok(None);
    }
    let mut events = Vec::with_capacity(count.min(input.remaining()));
    for _ in 0..count {
        let time = input.read_f32()?;
        let data_index = read_index(input, "event", event_data.len())?;
        let int_value = input.read_varint(false)?;
        let float_value = input.read_f32()?;
        let string = if input.read_bool()? {
            input.read_string()?
        } else {
            event_data[data_index].string.clone()
        };
        events.push(Event {
            time,
            data_index,
            int_value,
            float_value,
            string,
        });
    }
    Ok(Some(EventTimeline { events }))
}
