use anyhow::Result;

use kinect_retarget::config::Config;
use kinect_retarget::rig::humanoid::wave_recording;
use kinect_retarget::sensor::SensorMount;
use kinect_retarget::tracker::SpaceTransformer;

const CONFIG_PATH: &str = "config.toml";
/// 約3秒で1往復
const FRAMES: usize = 90;

fn main() -> Result<()> {
    let config = Config::load_or_default(CONFIG_PATH);

    // 出力先は引数 > 設定の再生ファイル
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config.feed.playback_path.clone());

    let mount = SensorMount::from_config(&config.sensor);
    let space = SpaceTransformer::from_mount(&mount, config.sensor.flip);
    let recording = wave_recording(&space, FRAMES, config.feed.playback_interval_ms)?;
    recording.save(&path)?;

    println!("Wrote {} frames to {}", recording.frames.len(), path);
    println!("Tilt: {:.1} deg", mount.tilt_degrees());
    Ok(())
}
