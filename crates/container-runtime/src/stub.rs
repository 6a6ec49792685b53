use std::collections::BTreeSet;
use std::sync::Mutex;
use tracing::info;

use crate::{ContainerRuntime, LaunchInvocation, LaunchedContainer, RuntimeError};

/// In-memory runtime for hosts without a container engine.
///
/// Every image exists unless a fixed set was given; launches are recorded
/// instead of executed.
#[derive(Debug, Default)]
pub struct StubRuntime {
    images: Option<BTreeSet<String>>,
    refuse_launches: bool,
    launches: Mutex<Vec<LaunchInvocation>>,
}

impl StubRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_images<I, S>(images: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            images: Some(images.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn refusing_launches(mut self) -> Self {
        self.refuse_launches = true;
        self
    }

    pub fn launches(&self) -> Vec<LaunchInvocation> {
        self.launches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl ContainerRuntime for StubRuntime {
    fn name(&self) -> &str {
        "stub"
    }

    fn image_exists(&self, image: &str) -> Result<bool, RuntimeError> {
        Ok(self
            .images
            .as_ref()
            .map_or(true, |images| images.contains(image)))
    }

    fn launch(&self, invocation: &LaunchInvocation) -> Result<LaunchedContainer, RuntimeError> {
        if self.refuse_launches {
            return Err(RuntimeError::StubLaunchRefused {
                image: invocation.image.clone(),
            });
        }

        let mut launches = self
            .launches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        launches.push(invocation.clone());
        info!(image = %invocation.image, count = launches.len(), "Stub runtime recorded launch");

        Ok(LaunchedContainer {
            container_id: Some(format!("stub-{}", launches.len())),
        })
    }
}
