//! Enrolling students into courses.
//!
//! [`batch_enroll`] takes one course and many candidate student ids and
//! sorts every id into exactly one outcome bucket, or none when the student
//! was already a member. Individual bad ids never fail the whole batch.
//! Memberships created before a store failure stay in place; retrying the
//! same batch is safe because creation is a get-or-create.

use serde::Deserialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::data::account::Account;
use crate::data::membership::Enrollment;
use crate::data::{CourseDirectory, IdentityStore, MembershipStore};
use crate::error::StoreError;
use crate::role::{CourseRole, Role};
use crate::util::{bracket_list, quoted_list};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, ToSchema)]
pub struct BatchEnrollRequest {
    pub course_id: i64,
    /// Processed in order; must not be empty.
    pub student_ids: Vec<i64>,
}

impl BatchEnrollRequest {
    pub fn validate(&self) -> Result<(), EnrollError> {
        if self.student_ids.is_empty() {
            return Err(EnrollError::Invalid(
                "student_ids: this list may not be empty.".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum EnrollError {
    #[error("caller has no profile")]
    MissingProfile,
    #[error("only {0} accounts may do this")]
    Forbidden(Role),
    #[error("invalid enrollment payload: {0}")]
    Invalid(String),
    #[error("course {0} not found or not owned by caller")]
    CourseNotFound(i64),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Per-id outcome of a batch, each bucket in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrollmentReport {
    /// Usernames of students that got a new membership.
    pub enrolled: Vec<String>,
    /// Ids with no account behind them.
    pub not_found: Vec<i64>,
    /// Usernames of accounts that aren't students, including ones without a profile.
    pub invalid_role: Vec<String>,
}

impl EnrollmentReport {
    /// A batch that created no membership counts as failed, even when every
    /// student was already enrolled beforehand.
    pub fn nothing_enrolled(&self) -> bool {
        self.enrolled.is_empty()
    }

    pub fn not_found_message(&self) -> Option<String> {
        if self.not_found.is_empty() {
            return None;
        }
        Some(format!(
            "User berikut tidak ditemukan di database: {}",
            bracket_list(&self.not_found)
        ))
    }

    pub fn invalid_role_message(&self) -> Option<String> {
        if self.invalid_role.is_empty() {
            return None;
        }
        Some(format!(
            "User berikut bukan siswa: {}",
            quoted_list(&self.invalid_role)
        ))
    }
}

/// Only teachers may enroll others. Checked before the payload is even looked at.
pub fn authorize_batch(caller: &Account) -> Result<(), EnrollError> {
    match caller.role() {
        Some(Role::Teacher) => Ok(()),
        Some(_) => Err(EnrollError::Forbidden(Role::Teacher)),
        None => Err(EnrollError::MissingProfile),
    }
}

pub async fn batch_enroll<S>(
    store: &S,
    caller: &Account,
    request: &BatchEnrollRequest,
) -> Result<EnrollmentReport, EnrollError>
where
    S: IdentityStore + CourseDirectory + MembershipStore + ?Sized,
{
    authorize_batch(caller)?;
    request.validate()?;

    let course = store
        .find_owned_course(request.course_id, caller.id)
        .await?
        .ok_or(EnrollError::CourseNotFound(request.course_id))?;

    let mut report = EnrollmentReport::default();

    for &student_id in &request.student_ids {
        let student = match store.get_account(student_id).await? {
            Some(it) => it,
            None => {
                tracing::debug!("batch enroll: account {} doesn't exist", student_id);
                report.not_found.push(student_id);
                continue;
            }
        };

        if !student.has_role(Role::Student) {
            tracing::debug!("batch enroll: '{}' isn't a student", student.username);
            report.invalid_role.push(student.username);
            continue;
        }

        let enrollment = store
            .get_or_create_membership(course.id, student.id, CourseRole::Student)
            .await?;

        if enrollment.created {
            report.enrolled.push(student.username);
        } else {
            tracing::debug!(
                "batch enroll: '{}' already a member of course {}",
                student.username,
                course.id
            );
        }
    }

    tracing::info!(
        course = course.id,
        enrolled = report.enrolled.len(),
        not_found = report.not_found.len(),
        invalid_role = report.invalid_role.len(),
        "batch enroll finished"
    );

    Ok(report)
}

/// A student joining a course on their own.
pub async fn self_enroll<S>(
    store: &S,
    caller: &Account,
    course_id: i64,
) -> Result<Enrollment, EnrollError>
where
    S: CourseDirectory + MembershipStore + ?Sized,
{
    match caller.role() {
        Some(Role::Student) => {}
        Some(_) => return Err(EnrollError::Forbidden(Role::Student)),
        None => return Err(EnrollError::MissingProfile),
    }

    let course = store
        .get_course(course_id)
        .await?
        .ok_or(EnrollError::CourseNotFound(course_id))?;

    Ok(store
        .get_or_create_membership(course.id, caller.id, CourseRole::Student)
        .await?)
}
