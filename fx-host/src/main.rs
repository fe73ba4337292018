//! # FX Host (headless)
//!
//! 在没有窗口的情况下按固定帧率驱动一段动画，打印播放事件与音效池统计。
//!
//! ## 用法
//!
//! ```bash
//! cargo run -p fx-host -- --list
//! cargo run -p fx-host -- --template lightning_strike \
//!     --bind caster=0,64,0 --bind target=10,64,-4 --seconds 2
//! cargo run -p fx-host -- --timeline demo.json --log-level debug
//! ```

use anyhow::{Context, bail};
use clap::Parser;
use fx_host::{AppConfig, FxHost};
use glam::Vec3;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "fx-host")]
#[command(about = "headless 效果宿主 - 按固定帧率驱动动画时间轴")]
#[command(version)]
struct Cli {
    /// 配置文件（默认：config.json）
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// 播放模板库中的模板
    #[arg(short, long, conflicts_with = "timeline")]
    template: Option<String>,

    /// 播放时间轴文档
    #[arg(long)]
    timeline: Option<PathBuf>,

    /// 占位符坐标，格式 name=x,y,z（可重复）
    #[arg(short, long = "bind", value_parser = parse_binding)]
    bindings: Vec<(String, Vec3)>,

    /// 最长运行时长（秒）
    #[arg(short, long, default_value_t = 5.0)]
    seconds: f32,

    /// 覆盖配置中的日志级别
    #[arg(long)]
    log_level: Option<String>,

    /// 列出模板库中的模板后退出
    #[arg(long)]
    list: bool,
}

fn parse_binding(s: &str) -> Result<(String, Vec3), String> {
    let (name, coords) = s
        .split_once('=')
        .ok_or_else(|| format!("缺少 '=': {}", s))?;

    let values = coords
        .split(',')
        .map(|v| v.trim().parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("坐标无效 '{}': {}", coords, e))?;

    match values.as_slice() {
        [x, y, z] if !name.is_empty() => Ok((name.to_string(), Vec3::new(*x, *y, *z))),
        _ => Err(format!("期望 name=x,y,z，实际为 '{}'", s)),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(&cli.config);
    let level = cli
        .log_level
        .as_deref()
        .unwrap_or(&config.log_level)
        .parse::<tracing::Level>()
        .context("无效的日志级别")?;
    tracing_subscriber::fmt().with_max_level(level).init();

    config.validate().context("配置无效")?;
    let frame_rate = config.timeline.frame_rate;
    let mut host = FxHost::new(config);

    if cli.list {
        for name in host.library().names() {
            println!("{}", name);
        }
        return Ok(());
    }

    let bindings: anim_runtime::Bindings = cli.bindings.into_iter().collect();
    let playback = match (&cli.template, &cli.timeline) {
        (Some(name), _) => host.trigger(name, &bindings)?,
        (None, Some(path)) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("无法读取时间轴文档: {}", path.display()))?;
            let timeline = anim_runtime::Timeline::from_json(&json)?;
            let timeline = anim_runtime::substitute(&timeline, &bindings)?;
            host.play(timeline)?
        }
        (None, None) => bail!("需要 --template 或 --timeline"),
    };

    let dt = Duration::from_secs_f64(1.0 / frame_rate as f64);
    let limit = Duration::from_secs_f32(cli.seconds.max(0.0));

    while host.now() < limit && host.is_playing(playback) {
        host.update(dt);
        for event in host.drain_events() {
            info!(at_ms = host.now().as_millis() as u64, event = ?event, "播放事件");
        }
    }

    if host.is_playing(playback) {
        info!(playback = %playback, "达到运行时长上限，停止播放");
        host.stop(playback);
    }

    if let Some(stats) = host.audio_stats() {
        println!("{}", stats.format());
    }
    host.shutdown();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_binding() {
        assert_eq!(
            parse_binding("target=1, 2.5,-3"),
            Ok(("target".to_string(), Vec3::new(1.0, 2.5, -3.0)))
        );
        assert!(parse_binding("target").is_err());
        assert!(parse_binding("target=1,2").is_err());
        assert!(parse_binding("=1,2,3").is_err());
    }
}
