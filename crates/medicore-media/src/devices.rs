//! Pre-call device checks.
//!
//! A [`DeviceProbe`] answers four independent questions (camera, microphone,
//! speakers, connectivity). The waiting room runs them concurrently and turns
//! each answer into a [`CheckStatus`].

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use medicore_shared::constants::{
    CAMERA_CHECK_MS, INTERNET_CHECK_MS, MICROPHONE_CHECK_MS, SPEAKERS_CHECK_MS,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceCheck {
    Camera,
    Microphone,
    Speakers,
    Internet,
}

impl DeviceCheck {
    pub const ALL: [DeviceCheck; 4] = [
        DeviceCheck::Camera,
        DeviceCheck::Microphone,
        DeviceCheck::Speakers,
        DeviceCheck::Internet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Camera => "camera",
            Self::Microphone => "microphone",
            Self::Speakers => "speakers",
            Self::Internet => "internet",
        }
    }

    /// What the patient is told to do when this check fails.
    pub fn remediation(&self) -> &'static str {
        match self {
            Self::Camera => "Allow camera access in your browser and make sure no other app is using it.",
            Self::Microphone => "Allow microphone access and check that the correct input device is selected.",
            Self::Speakers => "Turn up the volume or connect headphones, then run the check again.",
            Self::Internet => "Move closer to your router or switch to a wired connection.",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Self::Camera => 0,
            Self::Microphone => 1,
            Self::Speakers => 2,
            Self::Internet => 3,
        }
    }
}

impl fmt::Display for DeviceCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DeviceCheck {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "camera" => Ok(Self::Camera),
            "microphone" => Ok(Self::Microphone),
            "speakers" => Ok(Self::Speakers),
            "internet" => Ok(Self::Internet),
            other => Err(format!("unknown device check '{other}'")),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{check} check failed: {detail}")]
pub struct DeviceCheckFailure {
    pub check: DeviceCheck,
    pub detail: String,
}

impl DeviceCheckFailure {
    pub fn new(check: DeviceCheck, detail: impl Into<String>) -> Self {
        Self {
            check,
            detail: detail.into(),
        }
    }

    pub(crate) fn timed_out(check: DeviceCheck, after: Duration) -> Self {
        Self::new(check, format!("no answer after {}s", after.as_secs()))
    }

    pub fn remediation(&self) -> &'static str {
        self.check.remediation()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "status", content = "detail")]
pub enum CheckStatus {
    Checking,
    Success,
    Error(String),
}

impl CheckStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Checking)
    }
}

/// Source of truth for device availability.
#[async_trait]
pub trait DeviceProbe: Send + Sync {
    async fn check_camera(&self) -> Result<(), DeviceCheckFailure>;
    async fn check_microphone(&self) -> Result<(), DeviceCheckFailure>;
    async fn check_speakers(&self) -> Result<(), DeviceCheckFailure>;
    async fn check_connectivity(&self) -> Result<(), DeviceCheckFailure>;
}

pub async fn run_check(probe: &dyn DeviceProbe, check: DeviceCheck) -> Result<(), DeviceCheckFailure> {
    match check {
        DeviceCheck::Camera => probe.check_camera().await,
        DeviceCheck::Microphone => probe.check_microphone().await,
        DeviceCheck::Speakers => probe.check_speakers().await,
        DeviceCheck::Internet => probe.check_connectivity().await,
    }
}

#[derive(Debug, Clone)]
enum Fault {
    /// Fail the first `times` attempts, then succeed.
    Fail { times: u32, detail: String },
    /// Never answer.
    Stall,
}

/// Probe that answers after fixed delays. With no faults configured every
/// check passes.
#[derive(Debug)]
pub struct SimulatedDevices {
    delays: [Duration; 4],
    faults: HashMap<DeviceCheck, Fault>,
    attempts: [AtomicU32; 4],
}

impl Default for SimulatedDevices {
    fn default() -> Self {
        Self {
            delays: [
                Duration::from_millis(CAMERA_CHECK_MS),
                Duration::from_millis(MICROPHONE_CHECK_MS),
                Duration::from_millis(SPEAKERS_CHECK_MS),
                Duration::from_millis(INTERNET_CHECK_MS),
            ],
            faults: HashMap::new(),
            attempts: Default::default(),
        }
    }
}

impl SimulatedDevices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, check: DeviceCheck, delay: Duration) -> Self {
        self.delays[check.index()] = delay;
        self
    }

    pub fn failing(self, check: DeviceCheck, detail: &str) -> Self {
        self.failing_times(check, u32::MAX, detail)
    }

    pub fn failing_times(mut self, check: DeviceCheck, times: u32, detail: &str) -> Self {
        self.faults.insert(
            check,
            Fault::Fail {
                times,
                detail: detail.to_string(),
            },
        );
        self
    }

    pub fn stalling(mut self, check: DeviceCheck) -> Self {
        self.faults.insert(check, Fault::Stall);
        self
    }

    /// How many times `check` has been started.
    pub fn attempts(&self, check: DeviceCheck) -> u32 {
        self.attempts[check.index()].load(Ordering::SeqCst)
    }

    async fn answer(&self, check: DeviceCheck) -> Result<(), DeviceCheckFailure> {
        let attempt = self.attempts[check.index()].fetch_add(1, Ordering::SeqCst) + 1;
        debug!(%check, attempt, "probing device");

        if let Some(Fault::Stall) = self.faults.get(&check) {
            std::future::pending::<()>().await;
        }

        tokio::time::sleep(self.delays[check.index()]).await;

        match self.faults.get(&check) {
            Some(Fault::Fail { times, detail }) if attempt <= *times => {
                Err(DeviceCheckFailure::new(check, detail.clone()))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl DeviceProbe for SimulatedDevices {
    async fn check_camera(&self) -> Result<(), DeviceCheckFailure> {
        self.answer(DeviceCheck::Camera).await
    }

    async fn check_microphone(&self) -> Result<(), DeviceCheckFailure> {
        self.answer(DeviceCheck::Microphone).await
    }

    async fn check_speakers(&self) -> Result<(), DeviceCheckFailure> {
        self.answer(DeviceCheck::Speakers).await
    }

    async fn check_connectivity(&self) -> Result<(), DeviceCheckFailure> {
        self.answer(DeviceCheck::Internet).await
    }
}
