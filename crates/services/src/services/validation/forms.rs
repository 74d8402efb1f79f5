//! Composite validators: several field rules plus cross-field rules, reported
//! as the first failure (short-circuit).

use chrono::{DateTime, Utc};
use domain::models::{
    backlog::{BACKLOG_DESCRIPTION_MAX, BACKLOG_TITLE_MAX, BacklogItem, CreateBacklogItem, UpdateBacklogItem},
    cluster::{CLUSTER_DESCRIPTION_MAX, CLUSTER_NAME_MAX, Cluster, CreateCluster, UpdateCluster},
    event::{CreateEvent, UpdateEvent},
    project::{CreateProject, UpdateProject},
    sprint::{CreateSprint, UpdateSprint},
    task::{
        CreateTask, TASK_ATTACHMENT_BYTES_MAX, TASK_ATTACHMENTS_MAX, TASK_DESCRIPTION_MAX,
        TASK_TAGS_MAX, TASK_TITLE_MAX, TaskComment, UpdateTask, combined_tags_len,
    },
    upload::FileUpload,
    user::{ChangePassword, DeleteAccount, LoginRequest, RegisterUser, UpdateProfile},
};
use url::Url;

use super::{
    FieldKind, ValidationError, ValidationErrorCode, check_max_len, check_required,
    field::DESCRIPTION_MAX,
};

pub const PROFILE_FIELD_MAX: usize = 30;
pub const IMAGE_BYTES_MAX: usize = 5 * 1024 * 1024;
pub const IMAGE_CONTENT_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

/// Payloads that must pass before they may be sent.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Profile form: all five fields required, names capped at 30, phone of 8
/// digits, institutional email.
pub fn validate_profile(profile: &UpdateProfile) -> Result<(), ValidationError> {
    check_required("name", &profile.name)?;
    check_required("surname", &profile.surname)?;
    check_required("username", &profile.username)?;
    check_required("email", &profile.email)?;
    check_required("phone", &profile.phone)?;

    check_max_len("name", &profile.name, PROFILE_FIELD_MAX)?;
    check_max_len("surname", &profile.surname, PROFILE_FIELD_MAX)?;
    check_max_len("username", &profile.username, PROFILE_FIELD_MAX)?;

    FieldKind::Number.check("phone", &profile.phone)?;
    FieldKind::Email.check("email", &profile.email)
}

pub fn validate_password_change(change: &ChangePassword) -> Result<(), ValidationError> {
    check_required("oldPassword", &change.old_password)?;
    check_required("newPassword", &change.new_password)?;
    if change.old_password == change.new_password {
        return Err(ValidationError::for_field(
            "newPassword",
            ValidationErrorCode::Unchanged,
            "The new password must be different from the current one",
        ));
    }
    FieldKind::Password.check("newPassword", &change.new_password)
}

/// Returns the file back when it is acceptable.
pub fn validate_profile_picture(file: Option<&FileUpload>) -> Result<&FileUpload, ValidationError> {
    let Some(file) = file else {
        return Err(ValidationError::for_field(
            "profilePicture",
            ValidationErrorCode::Required,
            "Select an image",
        ));
    };
    check_image("profilePicture", file)?;
    Ok(file)
}

fn check_image(field: &'static str, file: &FileUpload) -> Result<(), ValidationError> {
    if !IMAGE_CONTENT_TYPES.contains(&file.content_type.as_str()) {
        return Err(ValidationError::for_field(
            field,
            ValidationErrorCode::UnsupportedType,
            "Only JPEG, PNG or WEBP images are allowed",
        ));
    }
    if file.size() > IMAGE_BYTES_MAX {
        return Err(ValidationError::for_field(
            field,
            ValidationErrorCode::TooLarge,
            "The image must not exceed 5MB",
        ));
    }
    Ok(())
}

fn check_date_range(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<(), ValidationError> {
    if end <= start {
        return Err(ValidationError::for_field(
            "endDate",
            ValidationErrorCode::InvalidDateRange,
            "The end date must be after the start date",
        ));
    }
    Ok(())
}

impl Validate for UpdateProfile {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_profile(self)
    }
}

impl Validate for ChangePassword {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_password_change(self)
    }
}

impl Validate for DeleteAccount {
    fn validate(&self) -> Result<(), ValidationError> {
        check_required("password", &self.password)
    }
}

impl Validate for RegisterUser {
    fn validate(&self) -> Result<(), ValidationError> {
        FieldKind::Name.check("name", &self.name)?;
        FieldKind::Name.check("surname", &self.surname)?;
        FieldKind::Username.check("username", &self.username)?;
        FieldKind::Email.check("email", &self.email)?;
        FieldKind::Number.check("phone", &self.phone)?;
        FieldKind::Password.check("password", &self.password)
    }
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        check_required("email", &self.email)?;
        check_required("password", &self.password)
    }
}

impl Validate for CreateCluster {
    fn validate(&self) -> Result<(), ValidationError> {
        check_required("name", &self.name)?;
        check_max_len("name", &self.name, CLUSTER_NAME_MAX)?;
        check_max_len("description", &self.description, CLUSTER_DESCRIPTION_MAX)?;
        match &self.image {
            Some(image) => check_image("image", image),
            None => Ok(()),
        }
    }
}

impl Validate for UpdateCluster {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_some() {
            check_required("name", &self.name)?;
            check_max_len("name", &self.name, CLUSTER_NAME_MAX)?;
        }
        check_max_len("description", &self.description, CLUSTER_DESCRIPTION_MAX)
    }
}

impl Validate for CreateProject {
    fn validate(&self) -> Result<(), ValidationError> {
        FieldKind::Title.check("title", &self.title)?;
        check_max_len("description", &self.description, DESCRIPTION_MAX)?;
        check_date_range(self.start_date, self.end_date)?;
        check_required("scrumMaster", &self.scrum_master)?;
        check_required("productOwner", &self.product_owner)?;
        check_required("cluster", &self.cluster)
    }
}

impl Validate for UpdateProject {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.title.is_some() {
            FieldKind::Title.check("title", &self.title)?;
        }
        check_max_len("description", &self.description, DESCRIPTION_MAX)?;
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            check_date_range(start, end)?;
        }
        Ok(())
    }
}

/// Scrum Master and Product Owner must both belong to the owning cluster.
pub fn check_project_roles(
    scrum_master: Option<&str>,
    product_owner: Option<&str>,
    cluster: &Cluster,
) -> Result<(), ValidationError> {
    for (field, user_id) in [("scrumMaster", scrum_master), ("productOwner", product_owner)] {
        if let Some(user_id) = user_id
            && !cluster.is_member(user_id)
        {
            return Err(ValidationError::for_field(
                field,
                ValidationErrorCode::NotMember,
                "The selected user is not a member of this group",
            ));
        }
    }
    Ok(())
}

impl Validate for CreateBacklogItem {
    fn validate(&self) -> Result<(), ValidationError> {
        check_required("title", &self.title)?;
        check_max_len("title", &self.title, BACKLOG_TITLE_MAX)?;
        check_max_len("description", &self.description, BACKLOG_DESCRIPTION_MAX)
    }
}

impl Validate for UpdateBacklogItem {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.title.is_some() {
            check_required("title", &self.title)?;
            check_max_len("title", &self.title, BACKLOG_TITLE_MAX)?;
        }
        check_max_len("description", &self.description, BACKLOG_DESCRIPTION_MAX)
    }
}

impl Validate for CreateSprint {
    fn validate(&self) -> Result<(), ValidationError> {
        FieldKind::Title.check("title", &self.title)?;
        check_required("objective", &self.objective)?;
        check_max_len("objective", &self.objective, DESCRIPTION_MAX)?;
        check_date_range(self.start_date, self.end_date)?;
        check_required("project", &self.project)
    }
}

impl Validate for UpdateSprint {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.title.is_some() {
            FieldKind::Title.check("title", &self.title)?;
        }
        check_max_len("objective", &self.objective, DESCRIPTION_MAX)?;
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            check_date_range(start, end)?;
        }
        Ok(())
    }
}

/// Every selected backlog item must exist in `backlog` and still be pending.
pub fn check_sprint_backlog(
    selected: &[String],
    backlog: &[BacklogItem],
) -> Result<(), ValidationError> {
    for id in selected {
        let eligible = backlog
            .iter()
            .find(|item| &item.id == id)
            .is_some_and(BacklogItem::is_sprint_eligible);
        if !eligible {
            return Err(ValidationError::for_field(
                "backlogItems",
                ValidationErrorCode::NotEligible,
                "Only pending backlog items can be added to a sprint",
            ));
        }
    }
    Ok(())
}

fn check_tags(tags: &[String]) -> Result<(), ValidationError> {
    if combined_tags_len(tags) > TASK_TAGS_MAX {
        return Err(ValidationError::too_long("tags", TASK_TAGS_MAX));
    }
    Ok(())
}

impl Validate for CreateTask {
    fn validate(&self) -> Result<(), ValidationError> {
        check_required("title", &self.title)?;
        check_max_len("title", &self.title, TASK_TITLE_MAX)?;
        check_max_len("description", &self.description, TASK_DESCRIPTION_MAX)?;
        check_required("assignedTo", &self.assigned_to)?;
        check_tags(&self.tags)?;
        check_required("sprint", &self.sprint)?;

        if self.attachments.len() > TASK_ATTACHMENTS_MAX {
            return Err(ValidationError::for_field(
                "attachments",
                ValidationErrorCode::TooMany,
                format!("At most {TASK_ATTACHMENTS_MAX} files can be attached"),
            ));
        }
        if let Some(file) = self
            .attachments
            .iter()
            .find(|f| f.size() > TASK_ATTACHMENT_BYTES_MAX)
        {
            return Err(ValidationError::for_field(
                "attachments",
                ValidationErrorCode::TooLarge,
                format!("{} exceeds the 25MB limit", file.file_name),
            ));
        }
        Ok(())
    }
}

impl Validate for UpdateTask {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.title.is_some() {
            check_required("title", &self.title)?;
            check_max_len("title", &self.title, TASK_TITLE_MAX)?;
        }
        check_max_len("description", &self.description, TASK_DESCRIPTION_MAX)?;
        if self.assigned_to.is_some() {
            check_required("assignedTo", &self.assigned_to)?;
        }
        match &self.tags {
            Some(tags) => check_tags(tags),
            None => Ok(()),
        }
    }
}

impl Validate for TaskComment {
    fn validate(&self) -> Result<(), ValidationError> {
        check_required("comment", &self.comment)?;
        check_max_len("comment", &self.comment, DESCRIPTION_MAX)
    }
}

fn check_meeting_link(link: Option<&str>) -> Result<(), ValidationError> {
    let Some(link) = link.map(str::trim).filter(|l| !l.is_empty()) else {
        return Ok(());
    };
    match Url::parse(link) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        _ => Err(ValidationError::for_field(
            "link",
            ValidationErrorCode::InvalidUrl,
            "The meeting link must be a valid http(s) URL",
        )),
    }
}

/// Event creation checked against an explicit clock.
pub fn validate_event_at(event: &CreateEvent, now: DateTime<Utc>) -> Result<(), ValidationError> {
    check_meeting_link(event.link.as_deref())?;
    if event.date <= now {
        return Err(ValidationError::for_field(
            "fecha",
            ValidationErrorCode::InPast,
            "The event must be scheduled in the future",
        ));
    }
    check_required("sprint", &event.sprint)
}

impl Validate for CreateEvent {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_event_at(self, Utc::now())
    }
}

impl Validate for UpdateEvent {
    fn validate(&self) -> Result<(), ValidationError> {
        check_meeting_link(self.link.as_deref())
    }
}
