use anyhow::{bail, Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use kinect_retarget::config::Config;
use kinect_retarget::rig::humanoid::build_humanoid;
use kinect_retarget::rig::{Armature, RetargetSettings, RigBone, RigRetargeter};
use kinect_retarget::sensor::{open_feed, Recorder};
use kinect_retarget::skeleton::JointIndex;
use kinect_retarget::tracker::SkeletonFrameProcessor;

const CONFIG_PATH: &str = "config.toml";
const DEFAULT_RECORD_BASE: &str = "recordings/playback";
const STATS_INTERVAL_SECS: f32 = 2.0;

struct Args {
    config_path: String,
    record: Option<String>,
    ticks: Option<u64>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        config_path: CONFIG_PATH.to_string(),
        record: None,
        ticks: None,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--record" => {
                args.record = Some(iter.next().context("--record needs a base path")?);
            }
            "--ticks" => {
                let n = iter.next().context("--ticks needs a count")?;
                args.ticks = Some(n.parse().with_context(|| format!("Invalid tick count: {}", n))?);
            }
            other if other.starts_with("--") => bail!("Unknown option: {}", other),
            other => args.config_path = other.to_string(),
        }
    }
    Ok(args)
}

/// SIGINT / SIGTERM で立つ停止フラグ
fn install_shutdown_flag() -> Result<Arc<AtomicBool>> {
    let shutdown = Arc::new(AtomicBool::new(false));
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(&shutdown))?;
    }
    Ok(shutdown)
}

/// 停止シグナルを受けるか `limit` ティックに達するまで続ける
fn keep_running(tick_count: u64, limit: Option<u64>, shutdown: &AtomicBool) -> bool {
    !shutdown.load(Ordering::Relaxed) && limit.map_or(true, |limit| tick_count < limit)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = parse_args()?;
    let config = Config::load_or_default(&args.config_path);

    println!("Kinect Retarget {}", env!("RETARGET_BUILD"));
    println!("Feed: {:?}", config.feed.mode);
    println!(
        "Sensor: height={} center={:?} look_at={:?} flip={:?}",
        config.sensor.height, config.sensor.center, config.sensor.look_at, config.sensor.flip
    );
    println!(
        "Retarget: player={} mask={:?} blend={} animated={}",
        config.retarget.player, config.retarget.mask, config.retarget.blend_weight, config.retarget.animated
    );
    println!();

    let settings = RetargetSettings::from_config(&config.retarget)?;

    // Ctrl-C でもループを抜けて録画を書き出す
    let shutdown = install_shutdown_flag()?;

    // 実機ドライバは組み込んでいないので emulator モードのみ動く
    let feed = open_feed(&config, None)?;
    let mut recorder = Recorder::new(
        feed,
        args.record.clone().unwrap_or_else(|| DEFAULT_RECORD_BASE.to_string()),
    );
    if args.record.is_some() {
        recorder.start();
    }

    let mut processor = SkeletonFrameProcessor::new(recorder, config.sensor.flip);

    let (mut rig, binding) = build_humanoid()?;
    let retargeter = RigRetargeter::initialize(&rig, binding)?;
    let head = retargeter.binding().bone(RigBone::Head);
    let hips = retargeter.binding().bone(RigBone::HipOverride);

    let tick_duration = Duration::try_from_secs_f32(config.feed.playback_interval_ms / 1000.0)
        .context("Invalid playback interval")?;

    let mut tick_count = 0u64;
    let mut frame_count = 0u32;
    let mut stats_timer = Instant::now();

    while keep_running(tick_count, args.ticks, &shutdown) {
        let tick_start = Instant::now();

        if processor.poll() {
            frame_count += 1;
            let rotated = retargeter.update(&mut rig, processor.skeletons(), &settings);

            let player = &processor.skeletons()[settings.player];
            debug!(
                rotated,
                head = ?player.position(JointIndex::Head),
                dt = processor.delta_time(),
                "frame"
            );
        }
        processor.end_tick();
        tick_count += 1;

        let elapsed = stats_timer.elapsed().as_secs_f32();
        if elapsed >= STATS_INTERVAL_SECS {
            let head_position = head.map(|n| rig.world_position(n));
            let hip_rotation = hips.map(|n| rig.world_rotation(n).euler_angles());
            info!(
                fps = frame_count as f32 / elapsed,
                players = ?processor.players(),
                head = ?head_position,
                hip_euler = ?hip_rotation,
                "retargeting"
            );
            frame_count = 0;
            stats_timer = Instant::now();
        }

        if let Some(remaining) = tick_duration.checked_sub(tick_start.elapsed()) {
            std::thread::sleep(remaining);
        }
    }

    if let Some(path) = processor.feed_mut().stop()? {
        println!("Saved recording: {}", path.display());
    }
    println!("Shutting down...");
    Ok(())
}
