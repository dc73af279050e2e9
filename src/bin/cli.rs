#![cfg(not(tarpaulin_include))]

use std::env;
use std::time::Instant;

use nexus_vitals::{Assessment, MonitorConfig, MonitorView, VitalsMonitor};

fn print_view(started: Instant, view: &MonitorView) {
    let status = view.status.label();
    let message = view.message.as_deref().unwrap_or("");

    match &view.metrics {
        Some(m) => {
            let flag = if Assessment::of(m).needs_attention() { " !" } else { "" };
            println!(
                "[{:.1}] ({} / {}) HR {} bpm | BP {}/{} | SpO2 {}% | stress {:.0} | {:.1}°F | {} steps | {} kcal{} {}",
                started.elapsed().as_secs_f64(),
                status,
                view.data_label(),
                m.heart_rate,
                m.blood_pressure.systolic,
                m.blood_pressure.diastolic,
                m.blood_oxygen_level,
                m.stress_level,
                m.body_temperature,
                m.steps_today,
                m.calories_burned,
                flag,
                message
            );
        }
        None => println!(
            "[{:.1}] ({} / {}) {}",
            started.elapsed().as_secs_f64(),
            status,
            view.data_label(),
            message
        ),
    }
}

/// Print every view the monitor publishes until Ctrl-C
///
/// # Usage
/// `vitals-watch [--demo]`
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let demo = env::args().skip(1).any(|arg| arg == "--demo");
    let config = MonitorConfig::load();
    let started = Instant::now();

    let monitor = VitalsMonitor::from_config(&config)
        .autoconnect(!demo)
        .spawn();
    if demo {
        monitor.demo().await;
    }

    let mut views = monitor.subscribe();
    print_view(started, &views.borrow_and_update());

    loop {
        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                print_view(started, &views.borrow_and_update());
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    monitor.stop().await;
    Ok(())
}
