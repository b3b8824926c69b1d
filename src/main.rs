use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use log::info;
use rand::Rng;

use myoguard::config::AppConfig;
use myoguard::session::NewUser;

/// Runs one synthetic screening session end to end: useful as a smoke test
/// of the full stack against a real database file.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config_path = std::env::var("MYOGUARD_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("myoguard.json"));
    let config = AppConfig::load(&config_path)?;
    info!("using database at {}", config.database_path.display());

    let manager = myoguard::bootstrap(&config)
        .await
        .context("failed to initialize session manager")?;

    let athlete = NewUser {
        name: "demo".into(),
        age: 28,
        height_cm: 178.0,
        weight_kg: 74.0,
        training_frequency: 3,
        fatigue_level: Some(2),
        previous_injury: None,
        muscle_group: "hamstrings".into(),
        contraction_type: None,
    };

    let device_id = "demo-device";
    let session_id = manager.start_session(athlete, 10, device_id).await?;
    info!("session {session_id} started");

    // Stream one second of synthetic EMG noise in quarter-second chunks.
    let chunk_len = (config.default_sampling_rate_hz / 4.0) as usize;
    let mut rng = rand::thread_rng();
    for _ in 0..4 {
        let samples: Vec<f64> = (0..chunk_len).map(|_| rng.gen_range(-0.5..0.5)).collect();
        manager.ingest_chunk(device_id, samples).await?;
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    let result = manager.end_session(&session_id, None).await?;
    info!("risk level: {}", result.risk_level);
    info!("training assignment:\n{}", result.training_assignment);

    Ok(())
}
