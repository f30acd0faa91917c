//! Closed-loop load generator for a running node.
//!
//! Each simulated user repeatedly picks one of two tasks at random: write a
//! fresh `{key: uuid}` pair through `POST /key`, or read a random key through
//! `GET /key/<key>`. Users pause for a random interval between tasks.

use std::collections::HashMap;
use std::ops::AddAssign;
use std::time::Duration;

use rand::Rng;
use reqwest::{Client, StatusCode};
use tokio::time::Instant;

#[derive(Clone, Debug)]
pub struct LoadConfig {
    pub target: String,
    pub users: usize,
    pub duration: Duration,
    pub key_length: usize,
    pub max_wait: Duration,
}

/// Outcome counts for one kind of task.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TaskStats {
    pub ok: u64,
    pub client_errors: u64,
    pub server_errors: u64,
    /// Requests that never produced a response.
    pub transport_errors: u64,
}

impl TaskStats {
    fn record(&mut self, outcome: Result<StatusCode, reqwest::Error>) {
        match outcome {
            Ok(status) if status.is_success() => self.ok += 1,
            Ok(status) if status.is_server_error() => self.server_errors += 1,
            Ok(_) => self.client_errors += 1,
            Err(e) => {
                tracing::debug!("request failed: {}", e);
                self.transport_errors += 1;
            }
        }
    }

    pub fn total(&self) -> u64 {
        self.ok + self.client_errors + self.server_errors + self.transport_errors
    }
}

impl AddAssign for TaskStats {
    fn add_assign(&mut self, rhs: Self) {
        self.ok += rhs.ok;
        self.client_errors += rhs.client_errors;
        self.server_errors += rhs.server_errors;
        self.transport_errors += rhs.transport_errors;
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub writes: TaskStats,
    pub reads: TaskStats,
}

impl AddAssign for LoadReport {
    fn add_assign(&mut self, rhs: Self) {
        self.writes += rhs.writes;
        self.reads += rhs.reads;
    }
}

/// Random key: the first `len` characters of a fresh UUIDv4.
pub fn random_key(len: usize) -> String {
    uuid::Uuid::new_v4().to_string().chars().take(len).collect()
}

/// Run `config.users` users against `config.target` until the duration ends.
pub async fn run(config: LoadConfig) -> anyhow::Result<LoadReport> {
    let client = Client::builder().build()?;
    let base = config.target.trim_end_matches('/').to_string();
    let deadline = Instant::now() + config.duration;

    let mut users = Vec::with_capacity(config.users);
    for _ in 0..config.users {
        let client = client.clone();
        let base = base.clone();
        let config = config.clone();
        users.push(tokio::spawn(async move {
            run_user(&client, &base, &config, deadline).await
        }));
    }

    let mut report = LoadReport::default();
    for user in users {
        report += user.await?;
    }
    Ok(report)
}

async fn run_user(client: &Client, base: &str, config: &LoadConfig, deadline: Instant) -> LoadReport {
    let mut report = LoadReport::default();
    while Instant::now() < deadline {
        let write = rand::random::<bool>();
        if write {
            let value = uuid::Uuid::new_v4().to_string();
            let key: String = value.chars().take(config.key_length).collect();
            let outcome = client
                .post(format!("{base}/key"))
                .json(&HashMap::from([(key, value)]))
                .send()
                .await
                .map(|r| r.status());
            report.writes.record(outcome);
        } else {
            let key = random_key(config.key_length);
            let outcome = client
                .get(format!("{base}/key/{key}"))
                .send()
                .await
                .map(|r| r.status());
            report.reads.record(outcome);
        }

        let max_ms = config.max_wait.as_millis() as u64;
        let pause = rand::thread_rng().gen_range(0..=max_ms);
        tokio::time::sleep(Duration::from_millis(pause)).await;
    }
    report
}
