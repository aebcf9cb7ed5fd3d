//! Background checker: sleeps the configured interval, runs a check cycle,
//! and keeps going whatever the outcome.

use std::time::Duration;

use actix_web::web;

use crate::app_state::AppState;

pub fn spawn(data: web::Data<AppState>, interval_secs: u64) {
    actix_web::rt::spawn(async move {
        log::info!("scheduler running every {interval_secs}s");
        loop {
            actix_web::rt::time::sleep(Duration::from_secs(interval_secs)).await;
            match data.check().await {
                Ok(fresh) if fresh.is_empty() => log::debug!("scheduled check: nothing new"),
                Ok(fresh) => log::info!("scheduled check: {} series updated", fresh.len()),
                Err(e) => log::error!("scheduled check failed: {e}"),
            }
        }
    });
}
