use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use aliasr_backend::{NullBackend, NullIssuer, RecognitionBackend, TokenCache, TokenIssuer};
use aliasr_bridge::{ManualPipeline, MediaPipeline, PipelineEvent};
use aliasr_control::AsrControl;
use aliasr_core::{AppConfig, AudioFrame, Credentials};
use aliasr_publish::{ChannelNotifier, EventPublisher};

#[derive(Parser)]
#[command(name = "aliasr", about = "Call-audio to streaming-ASR bridge")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from_file(&cli.config)
        .with_context(|| format!("failed to load config from {:?}", cli.config))?;

    let env_filter =
        EnvFilter::try_new(&config.general.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!("aliasr starting");

    let creds = match &config.credentials {
        Some(c) => Credentials {
            app_key: c.app_key.clone(),
            access_key_id: c.access_key_id.clone(),
            access_key_secret: c.access_key_secret.clone(),
        },
        None => Credentials {
            app_key: "demo-app".into(),
            access_key_id: "demo-id".into(),
            access_key_secret: "demo-secret".into(),
        },
    };

    // The real telephony platform and vendor SDK live outside this
    // process; the demo run wires their in-repo doubles end to end.
    let backend = Arc::new(NullBackend::new());
    let issuer = Arc::new(NullIssuer::new(Duration::from_secs(3600)));
    let pipeline = Arc::new(ManualPipeline::new());
    let (notifier, mut notifications) = ChannelNotifier::new();

    let control = AsrControl::new(
        Arc::clone(&backend) as Arc<dyn RecognitionBackend>,
        issuer as Arc<dyn TokenIssuer>,
        Arc::new(TokenCache::with_margin(Duration::from_secs(
            config.asr.token_refresh_margin_secs,
        ))),
        Arc::new(EventPublisher::new(Arc::new(notifier))),
        Arc::clone(&pipeline) as Arc<dyn MediaPipeline>,
        config.asr.clone(),
    );

    let subscriber = tokio::spawn(async move {
        while let Some(n) = notifications.recv().await {
            tracing::info!(
                subclass = n.subclass(),
                call_id = n.call_id(),
                "notification: {n:?}"
            );
        }
    });

    let call_id = "demo-call-0001";
    control
        .start(call_id, creds)
        .await
        .context("failed to start ASR on demo call")?;

    // One second of 440Hz tone at 16kHz, delivered as 20ms frames, so
    // the bridge exercises the resampling path down to the target rate.
    let input_rate = 16_000u32;
    let frame_len = (input_rate / 50) as usize;
    pipeline.push(
        call_id,
        PipelineEvent::StreamOpen {
            sample_rate: input_rate,
        },
    );
    for n in 0..50 {
        let samples: Vec<i16> = (0..frame_len)
            .map(|i| {
                let t = (n * frame_len + i) as f32 / input_rate as f32;
                ((t * 440.0 * std::f32::consts::TAU).sin() * 3000.0) as i16
            })
            .collect();
        pipeline.push(
            call_id,
            PipelineEvent::Frame(AudioFrame {
                samples,
                sample_rate: input_rate,
                channels: 1,
            }),
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    pipeline.hangup(call_id);
    tokio::time::sleep(Duration::from_millis(100)).await;
    control.stop(call_id).await;
    // Dropping the control releases the notifier, ending the subscriber.
    drop(control);
    subscriber.await.ok();

    tracing::info!(
        sessions = backend.sessions_created(),
        bytes_fed = backend.bytes_fed(),
        "demo call finished"
    );
    Ok(())
}
