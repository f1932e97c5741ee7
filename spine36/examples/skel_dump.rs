use serde_json::json;
use spine36::{Atlas, SkeletonData};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn load_skeleton_data(path: &PathBuf, atlas: Option<&PathBuf>, scale: f32) -> Arc<SkeletonData> {
    let bytes = std::fs::read(path).expect("read skel");
    match atlas {
        Some(atlas_path) => {
            let atlas: Atlas = std::fs::read_to_string(atlas_path)
                .expect("read atlas")
                .parse()
                .expect("parse atlas");
            SkeletonData::from_skel_bytes_with_atlas(&bytes, &atlas, scale).expect("parse skel")
        }
        None => SkeletonData::from_skel_bytes_with_scale(&bytes, scale).expect("parse skel"),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut positional = Vec::<String>::new();
    let mut scale = 1.0f32;
    let mut atlas: Option<PathBuf> = None;
    let mut full = false;

    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--scale" => {
                scale = args
                    .get(i + 1)
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1.0);
                i += 2;
            }
            "--atlas" => {
                atlas = args.get(i + 1).map(PathBuf::from);
                i += 2;
            }
            "--full" => {
                full = true;
                i += 1;
            }
            other => {
                positional.push(other.to_string());
                i += 1;
            }
        }
    }

    let Some(skel_path) = positional.first().map(PathBuf::from) else {
        eprintln!("usage: skel_dump <file.skel> [--scale <f32>] [--atlas <file.atlas>] [--full]");
        std::process::exit(2);
    };

    let data = load_skeleton_data(&skel_path, atlas.as_ref(), scale);
    if full {
        println!(
            "{}",
            serde_json::to_string_pretty(&*data).expect("serialize skeleton")
        );
        return;
    }

    let skins = data
        .skins
        .iter()
        .map(|skin| json!({ "name": skin.name, "attachments": skin.attachment_count() }))
        .collect::<Vec<_>>();
    let animations = data
        .animations
        .iter()
        .map(|a| json!({ "name": a.name, "duration": a.duration, "timelines": a.timelines.len() }))
        .collect::<Vec<_>>();

    let out = json!({
        "hash": data.hash,
        "version": data.version,
        "width": data.width,
        "height": data.height,
        "fps": data.fps,
        "images": data.images_path,
        "bones": data.bones.len(),
        "slots": data.slots.len(),
        "ik_constraints": data.ik_constraints.len(),
        "transform_constraints": data.transform_constraints.len(),
        "path_constraints": data.path_constraints.len(),
        "events": data.events.iter().map(|e| e.name.as_str()).collect::<Vec<_>>(),
        "skins": skins,
        "animations": animations,
    });
    println!("{}", serde_json::to_string_pretty(&out).expect("serialize summary"));
}
