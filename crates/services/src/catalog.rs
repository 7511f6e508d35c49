use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use booking_core::model::CourseOption;

use crate::config::BookingConfig;
use crate::error::{CatalogError, ConfigError};

pub const COURSES_PATH: &str = "courses";

/// Source of the course list offered on the student-details step.
#[async_trait]
pub trait CourseCatalog: Send + Sync {
    /// # Errors
    ///
    /// Returns `CatalogError` when the list cannot be fetched or read.
    async fn courses(&self) -> Result<Vec<CourseOption>, CatalogError>;
}

/// `CourseCatalog` backed by `GET {base}/courses`.
#[derive(Clone, Debug)]
pub struct HttpCourseCatalog {
    client: Client,
    url: String,
}

impl HttpCourseCatalog {
    /// # Errors
    ///
    /// Returns `ConfigError` if the base URL is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: &BookingConfig) -> Result<Self, ConfigError> {
        config.check()?;
        let client = Client::builder().timeout(config.attempt_timeout).build()?;
        Ok(Self::with_client(client, config))
    }

    #[must_use]
    pub fn with_client(client: Client, config: &BookingConfig) -> Self {
        Self {
            client,
            url: config.endpoint(COURSES_PATH),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CoursesBody {
    List(Vec<CourseOption>),
    Wrapped { data: Vec<CourseOption> },
}

impl CoursesBody {
    fn into_courses(self) -> Vec<CourseOption> {
        match self {
            CoursesBody::List(courses) | CoursesBody::Wrapped { data: courses } => courses,
        }
    }
}

#[async_trait]
impl CourseCatalog for HttpCourseCatalog {
    async fn courses(&self) -> Result<Vec<CourseOption>, CatalogError> {
        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(CatalogError::HttpStatus(response.status()));
        }
        let body: CoursesBody = response.json().await?;
        Ok(body.into_courses())
    }
}
