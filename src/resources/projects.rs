//! Project store: listing, CRUD, status transitions and gallery operations.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;
use crate::http::ApiClient;
use crate::models::{CreateProjectRequest, Project, ProjectStatus, UpdateProjectRequest};

use super::{reconcile, CacheOp, Keyed};

const LOAD_FAILED: &str = "Failed to load projects";
const NOT_FOUND: &str = "Project not found";
const CREATE_FAILED: &str = "Failed to create project";
const UPDATE_FAILED: &str = "Failed to update project";
const STATUS_FAILED: &str = "Failed to change project status";
const DELETE_FAILED: &str = "Failed to delete project";
const UPLOAD_FAILED: &str = "Failed to upload image";

impl Keyed for Project {
    fn key(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProjectFilters {
    /// Sent to the backend as the `status` query parameter.
    pub status: Option<ProjectStatus>,
    /// Applied client-side between round trips.
    pub search: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectsState {
    pub projects: Vec<Project>,
    pub current_project: Option<Project>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub filters: ProjectFilters,
}

pub struct ProjectService {
    client: Arc<ApiClient>,
    state: RwLock<ProjectsState>,
}

impl ProjectService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            client,
            state: RwLock::new(ProjectsState::default()),
        }
    }

    pub async fn state(&self) -> ProjectsState {
        self.state.read().await.clone()
    }

    pub async fn clear_error(&self) {
        self.state.write().await.error = None;
    }

    /// Drops the detail entry. Views call this on unmount so a reused detail
    /// view never shows data for a previous id.
    pub async fn clear_current(&self) {
        self.state.write().await.current_project = None;
    }

    async fn begin(&self) {
        let mut state = self.state.write().await;
        state.is_loading = true;
        state.error = None;
    }

    async fn fail(&self, err: ApiError, fallback: &str) {
        let mut state = self.state.write().await;
        state.is_loading = false;
        state.error = Some(err.message_or(fallback));
    }

    /// Replaces the cached collection with the backend result for the
    /// current status filter.
    pub async fn fetch_projects(&self) -> bool {
        let status = self.state.read().await.filters.status;
        self.begin().await;

        let query: Vec<(&str, String)> = status
            .map(|status| vec![("status", status.to_string())])
            .unwrap_or_default();

        match self
            .client
            .get_with_query::<Vec<Project>>("/projects", &query)
            .await
        {
            Ok(projects) => {
                debug!(count = projects.len(), ?status, "projects fetched");
                let mut state = self.state.write().await;
                state.is_loading = false;
                reconcile(&mut state.projects, CacheOp::Replace(projects));
                true
            }
            Err(err) => {
                self.fail(err, LOAD_FAILED).await;
                false
            }
        }
    }

    pub async fn fetch_project(&self, id: Uuid) -> Option<Project> {
        self.begin().await;
        match self.client.get::<Project>(&format!("/projects/{id}")).await {
            Ok(project) => {
                let mut state = self.state.write().await;
                state.is_loading = false;
                state.current_project = Some(project.clone());
                Some(project)
            }
            Err(err) => {
                self.fail(err, NOT_FOUND).await;
                None
            }
        }
    }

    /// Creates a project and prepends it to the cached collection.
    pub async fn create_project(&self, request: CreateProjectRequest) -> Option<Project> {
        if let Err(errors) = request.validate() {
            let mut state = self.state.write().await;
            state.error = Some(ApiError::from(errors).user_message());
            return None;
        }

        self.begin().await;
        match self.client.post::<_, Project>("/projects", &request).await {
            Ok(project) => {
                let mut state = self.state.write().await;
                state.is_loading = false;
                reconcile(&mut state.projects, CacheOp::Prepend(project.clone()));
                Some(project)
            }
            Err(err) => {
                self.fail(err, CREATE_FAILED).await;
                None
            }
        }
    }

    pub async fn update_project(&self, id: Uuid, request: UpdateProjectRequest) -> Option<Project> {
        self.begin().await;
        match self
            .client
            .patch::<_, Project>(&format!("/projects/{id}"), &request)
            .await
        {
            Ok(project) => {
                self.absorb_updated(project.clone()).await;
                Some(project)
            }
            Err(err) => {
                self.fail(err, UPDATE_FAILED).await;
                None
            }
        }
    }

    /// Moves a project through its lifecycle. Transitions outside the legal
    /// table are rejected locally without a network call; the backend stays
    /// the final authority for the rest.
    pub async fn update_status(&self, id: Uuid, next: ProjectStatus) -> Option<Project> {
        let current_status = {
            let state = self.state.read().await;
            state
                .projects
                .iter()
                .find(|project| project.id == id)
                .map(|project| project.status)
                .or_else(|| {
                    state
                        .current_project
                        .as_ref()
                        .filter(|project| project.id == id)
                        .map(|project| project.status)
                })
        };

        if let Some(current) = current_status {
            if !current.can_transition_to(next) {
                let mut state = self.state.write().await;
                state.error = Some(format!("Cannot change project status from {current} to {next}"));
                return None;
            }
        }

        self.begin().await;
        match self
            .client
            .patch_empty::<Project>(&format!("/projects/{id}/status/{next}"))
            .await
        {
            Ok(project) => {
                self.absorb_updated(project.clone()).await;
                Some(project)
            }
            Err(err) => {
                self.fail(err, STATUS_FAILED).await;
                None
            }
        }
    }

    /// Deletes a project and prunes it from the cache. Authorization is a UI
    /// concern (`UserRole::can_delete_projects`); this store only executes.
    pub async fn delete_project(&self, id: Uuid) -> bool {
        self.begin().await;
        match self.client.delete_no_content(&format!("/projects/{id}")).await {
            Ok(()) => {
                let mut state = self.state.write().await;
                state.is_loading = false;
                reconcile(&mut state.projects, CacheOp::Remove(id));
                true
            }
            Err(err) => {
                self.fail(err, DELETE_FAILED).await;
                false
            }
        }
    }

    /// Uploads one gallery image; the backend responds with the updated
    /// project, which replaces the cached entry.
    pub async fn upload_image(&self, id: Uuid, file_name: &str, bytes: &[u8]) -> Option<Project> {
        self.begin().await;
        match self
            .client
            .upload_file::<Project>(
                &format!("/projects/{id}/images/upload"),
                "file",
                file_name,
                bytes,
            )
            .await
        {
            Ok(project) => {
                self.absorb_updated(project.clone()).await;
                Some(project)
            }
            Err(err) => {
                self.fail(err, UPLOAD_FAILED).await;
                None
            }
        }
    }

    pub async fn delete_image(&self, id: Uuid, file_name: &str) -> Option<Project> {
        self.begin().await;
        match self
            .client
            .delete::<Project>(&format!("/projects/{id}/images/{file_name}"))
            .await
        {
            Ok(project) => {
                self.absorb_updated(project.clone()).await;
                Some(project)
            }
            Err(err) => {
                self.fail(err, UPDATE_FAILED).await;
                None
            }
        }
    }

    /// Changing the status filter re-fetches from the backend.
    pub async fn set_status_filter(&self, status: Option<ProjectStatus>) -> bool {
        self.state.write().await.filters.status = status;
        self.fetch_projects().await
    }

    /// The project listing endpoint has no search parameter; the term only
    /// narrows the cached collection via `visible_projects`.
    pub async fn set_search(&self, search: impl Into<String>) {
        self.state.write().await.filters.search = search.into();
    }

    /// Cached projects narrowed by the free-text filter, for immediate
    /// feedback between round trips.
    pub async fn visible_projects(&self) -> Vec<Project> {
        let state = self.state.read().await;
        let needle = state.filters.search.trim().to_lowercase();
        if needle.is_empty() {
            return state.projects.clone();
        }
        state
            .projects
            .iter()
            .filter(|project| {
                project.name.to_lowercase().contains(&needle)
                    || project.location.to_lowercase().contains(&needle)
                    || project.slug.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect()
    }

    /// List and detail views stay consistent without a refetch: the entity
    /// is replaced in the collection, and in `current_project` when the ids
    /// match.
    async fn absorb_updated(&self, project: Project) {
        let mut state = self.state.write().await;
        state.is_loading = false;
        if state
            .current_project
            .as_ref()
            .is_some_and(|current| current.id == project.id)
        {
            state.current_project = Some(project.clone());
        }
        reconcile(&mut state.projects, CacheOp::Update(project));
    }
}
