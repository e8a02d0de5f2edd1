/// Role profile model and database operations
///
/// Every account owns at most one profile, and a profile is exactly one of
/// three mutually exclusive roles: student, parent or instructor. The role and
/// its fields travel together in [`RoleDetails`], so a profile can never hold
/// a student ID and an employee ID at the same time.
///
/// # Schema
///
/// All roles share a single `profiles` table keyed by a unique `account_id`;
/// role-specific columns are empty (or NULL) for the other roles. See
/// `migrations/20250101000002_create_profiles.up.sql`.
///
/// # Invariants
///
/// Checked by [`Profile::validate`] before every write:
///
/// - phone numbers (when non-empty) match `^\+?1?\d{9,15}$`
/// - birth date, if set, is not in the future
/// - GPA is within `[0.0, 4.0]`
/// - years of experience is not negative
/// - students carry a student ID, instructors an employee ID

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::PgPool;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::account::AccountSummary;

/// International phone number format accepted for profiles
pub static PHONE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\+?1?\d{9,15}$").expect("phone number pattern is valid")
});

const MAX_BIO_LEN: usize = 500;
const MAX_AVATAR_LEN: usize = 512;
const MAX_IDENTIFIER_LEN: usize = 20;
const MAX_GPA: f64 = 4.0;

/// Profile role discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileRole {
    Student,
    Parent,
    Instructor,
}

impl ProfileRole {
    /// All roles, in listing order
    pub const ALL: [ProfileRole; 3] = [
        ProfileRole::Student,
        ProfileRole::Parent,
        ProfileRole::Instructor,
    ];

    /// Gets role as its stored string
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileRole::Student => "student",
            ProfileRole::Parent => "parent",
            ProfileRole::Instructor => "instructor",
        }
    }
}

impl fmt::Display for ProfileRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(ProfileRole::Student),
            "parent" => Ok(ProfileRole::Parent),
            "instructor" => Ok(ProfileRole::Instructor),
            other => Err(format!("Unknown profile role: {}", other)),
        }
    }
}

/// Student-specific fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudentDetails {
    /// School-issued student ID (unique)
    pub student_id: String,
    pub grade_level: String,
    /// Defaults to the day the student role was assigned
    pub enrollment_date: Option<NaiveDate>,
    pub graduation_year: Option<i32>,
    /// Grade point average in `[0.0, 4.0]`
    pub gpa: Option<f64>,
    pub major: String,
    /// Profile ID of the student's parent, if linked
    pub parent_id: Option<Uuid>,
}

/// Parent-specific fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParentDetails {
    pub occupation: String,
    pub emergency_contact: String,
    pub address: String,
}

/// Instructor-specific fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstructorDetails {
    /// Staff employee ID (unique)
    pub employee_id: String,
    pub department: String,
    pub specialization: String,
    /// Defaults to the day the instructor role was assigned
    pub hire_date: Option<NaiveDate>,
    pub office_location: String,
    pub office_hours: String,
    pub qualification: String,
    pub years_experience: i32,
}

/// Role-specific part of a profile
///
/// Serialized with an inline `role` tag:
///
/// ```json
/// { "role": "student", "student_id": "S-001", "gpa": 3.4 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum RoleDetails {
    Student(StudentDetails),
    Parent(ParentDetails),
    Instructor(InstructorDetails),
}

impl Default for RoleDetails {
    /// New profiles start out as an empty parent profile
    fn default() -> Self {
        RoleDetails::Parent(ParentDetails::default())
    }
}

impl RoleDetails {
    /// Gets the role discriminator
    pub fn role(&self) -> ProfileRole {
        match self {
            RoleDetails::Student(_) => ProfileRole::Student,
            RoleDetails::Parent(_) => ProfileRole::Parent,
            RoleDetails::Instructor(_) => ProfileRole::Instructor,
        }
    }

    /// Fills date fields that default to "today" when a role is assigned
    pub fn with_defaults(mut self, today: NaiveDate) -> Self {
        match &mut self {
            RoleDetails::Student(s) => {
                s.enrollment_date.get_or_insert(today);
            }
            RoleDetails::Instructor(i) => {
                i.hire_date.get_or_insert(today);
            }
            RoleDetails::Parent(_) => {}
        }
        self
    }
}

/// Profile validation failures
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProfileValidationError {
    #[error("Phone number must be entered in the format: '+999999999'. Up to 15 digits allowed.")]
    InvalidPhoneNumber { field: &'static str },

    #[error("Birth date cannot be in the future.")]
    BirthDateInFuture,

    #[error("GPA must be between 0.0 and 4.0.")]
    GpaOutOfRange,

    #[error("Years of experience cannot be negative.")]
    NegativeExperience,

    #[error("{field} is required")]
    MissingField { field: &'static str },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("{field} must be an http(s) URL")]
    InvalidUrl { field: &'static str },

    #[error("parent_id must reference a parent profile")]
    InvalidParent,
}

impl ProfileValidationError {
    /// Name of the offending field
    pub fn field(&self) -> &'static str {
        match self {
            ProfileValidationError::InvalidPhoneNumber { field } => field,
            ProfileValidationError::BirthDateInFuture => "birth_date",
            ProfileValidationError::GpaOutOfRange => "gpa",
            ProfileValidationError::NegativeExperience => "years_experience",
            ProfileValidationError::MissingField { field } => field,
            ProfileValidationError::TooLong { field, .. } => field,
            ProfileValidationError::InvalidUrl { field } => field,
            ProfileValidationError::InvalidParent => "parent_id",
        }
    }
}

/// Role profile attached to an account
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    /// Unique profile ID
    pub id: Uuid,

    /// Owning account (one profile per account)
    pub account_id: Uuid,

    pub phone_number: String,
    pub birth_date: Option<NaiveDate>,
    pub bio: String,
    pub avatar: String,

    /// Role tag and role-specific fields
    #[serde(flatten)]
    pub details: RoleDetails,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Builds an empty profile for an account
    pub fn empty(account_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            account_id,
            phone_number: String::new(),
            birth_date: None,
            bio: String::new(),
            avatar: String::new(),
            details: RoleDetails::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Gets the profile role
    pub fn role(&self) -> ProfileRole {
        self.details.role()
    }

    /// Age in whole years on `today`, if a birth date is known
    pub fn age_on(&self, today: NaiveDate) -> Option<u32> {
        let born = self.birth_date?;
        let mut age = today.year() - born.year();
        if (today.month(), today.day()) < (born.month(), born.day()) {
            age -= 1;
        }
        u32::try_from(age).ok()
    }

    /// Checks the profile invariants
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self, today: NaiveDate) -> Result<(), ProfileValidationError> {
        check_phone("phone_number", &self.phone_number)?;

        if matches!(self.birth_date, Some(born) if born > today) {
            return Err(ProfileValidationError::BirthDateInFuture);
        }

        check_len("bio", &self.bio, MAX_BIO_LEN)?;
        check_len("avatar", &self.avatar, MAX_AVATAR_LEN)?;
        if !self.avatar.is_empty()
            && !(self.avatar.starts_with("http://") || self.avatar.starts_with("https://"))
        {
            return Err(ProfileValidationError::InvalidUrl { field: "avatar" });
        }

        match &self.details {
            RoleDetails::Student(s) => {
                check_identifier("student_id", &s.student_id)?;
                if matches!(s.gpa, Some(gpa) if !(0.0..=MAX_GPA).contains(&gpa)) {
                    return Err(ProfileValidationError::GpaOutOfRange);
                }
                check_len("grade_level", &s.grade_level, 20)?;
                check_len("major", &s.major, 100)?;
            }
            RoleDetails::Parent(p) => {
                check_len("occupation", &p.occupation, 100)?;
                check_len("emergency_contact", &p.emergency_contact, 17)?;
                check_len("address", &p.address, 200)?;
            }
            RoleDetails::Instructor(i) => {
                check_identifier("employee_id", &i.employee_id)?;
                if i.years_experience < 0 {
                    return Err(ProfileValidationError::NegativeExperience);
                }
                check_len("department", &i.department, 100)?;
                check_len("specialization", &i.specialization, 150)?;
                check_len("office_location", &i.office_location, 100)?;
                check_len("office_hours", &i.office_hours, 200)?;
                check_len("qualification", &i.qualification, 200)?;
            }
        }

        Ok(())
    }
}

fn check_phone(field: &'static str, value: &str) -> Result<(), ProfileValidationError> {
    if value.is_empty() || PHONE_REGEX.is_match(value) {
        Ok(())
    } else {
        Err(ProfileValidationError::InvalidPhoneNumber { field })
    }
}

fn check_len(field: &'static str, value: &str, max: usize) -> Result<(), ProfileValidationError> {
    if value.chars().count() > max {
        Err(ProfileValidationError::TooLong { field, max })
    } else {
        Ok(())
    }
}

fn check_identifier(field: &'static str, value: &str) -> Result<(), ProfileValidationError> {
    if value.trim().is_empty() {
        return Err(ProfileValidationError::MissingField { field });
    }
    check_len(field, value, MAX_IDENTIFIER_LEN)
}

/// Partial update of a profile
///
/// Absent fields are left untouched. `birth_date: null` clears the birth
/// date; a `details` object replaces the role and all role fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileChanges {
    pub phone_number: Option<String>,

    #[serde(default, deserialize_with = "deserialize_present")]
    pub birth_date: Option<Option<NaiveDate>>,

    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub details: Option<RoleDetails>,
}

fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl ProfileChanges {
    /// Returns true if nothing would change
    pub fn is_empty(&self) -> bool {
        self.phone_number.is_none()
            && self.birth_date.is_none()
            && self.bio.is_none()
            && self.avatar.is_none()
            && self.details.is_none()
    }

    /// Applies the changes to a profile in place
    pub fn apply(self, profile: &mut Profile, today: NaiveDate) {
        if let Some(phone) = self.phone_number {
            profile.phone_number = phone.trim().to_string();
        }
        if let Some(birth_date) = self.birth_date {
            profile.birth_date = birth_date;
        }
        if let Some(bio) = self.bio {
            profile.bio = bio;
        }
        if let Some(avatar) = self.avatar {
            profile.avatar = avatar.trim().to_string();
        }
        if let Some(details) = self.details {
            profile.details = details.with_defaults(today);
        }
        profile.updated_at = Utc::now();
    }
}

/// Profile joined with its account, as shown in role listings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileListing {
    pub profile: Profile,
    pub account: AccountSummary,
    /// Number of students linked to this profile (parents only)
    pub children_count: i64,
}

/// Profile counts per role
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileCounts {
    pub students: i64,
    pub parents: i64,
    pub instructors: i64,
}

impl ProfileCounts {
    /// Adds `n` to the counter of `role`
    pub fn add(&mut self, role: ProfileRole, n: i64) {
        match role {
            ProfileRole::Student => self.students += n,
            ProfileRole::Parent => self.parents += n,
            ProfileRole::Instructor => self.instructors += n,
        }
    }

    /// Total number of profiles
    pub fn total(&self) -> i64 {
        self.students + self.parents + self.instructors
    }
}

const PROFILE_COLUMNS: &str = r#"
    p.id, p.account_id, p.role, p.phone_number, p.birth_date, p.bio, p.avatar,
    p.student_id, p.grade_level, p.enrollment_date, p.graduation_year, p.gpa, p.major, p.parent_id,
    p.occupation, p.emergency_contact, p.address,
    p.employee_id, p.department, p.specialization, p.hire_date, p.office_location,
    p.office_hours, p.qualification, p.years_experience,
    p.created_at, p.updated_at
"#;

/// Flat database row for a profile
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProfileRow {
    pub id: Uuid,
    pub account_id: Uuid,
    pub role: String,
    pub phone_number: String,
    pub birth_date: Option<NaiveDate>,
    pub bio: String,
    pub avatar: String,
    pub student_id: Option<String>,
    pub grade_level: String,
    pub enrollment_date: Option<NaiveDate>,
    pub graduation_year: Option<i32>,
    pub gpa: Option<f64>,
    pub major: String,
    pub parent_id: Option<Uuid>,
    pub occupation: String,
    pub emergency_contact: String,
    pub address: String,
    pub employee_id: Option<String>,
    pub department: String,
    pub specialization: String,
    pub hire_date: Option<NaiveDate>,
    pub office_location: String,
    pub office_hours: String,
    pub qualification: String,
    pub years_experience: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = sqlx::Error;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .parse::<ProfileRole>()
            .map_err(|e| sqlx::Error::Decode(e.into()))?;

        let details = match role {
            ProfileRole::Student => RoleDetails::Student(StudentDetails {
                student_id: row.student_id.unwrap_or_default(),
                grade_level: row.grade_level,
                enrollment_date: row.enrollment_date,
                graduation_year: row.graduation_year,
                gpa: row.gpa,
                major: row.major,
                parent_id: row.parent_id,
            }),
            ProfileRole::Parent => RoleDetails::Parent(ParentDetails {
                occupation: row.occupation,
                emergency_contact: row.emergency_contact,
                address: row.address,
            }),
            ProfileRole::Instructor => RoleDetails::Instructor(InstructorDetails {
                employee_id: row.employee_id.unwrap_or_default(),
                department: row.department,
                specialization: row.specialization,
                hire_date: row.hire_date,
                office_location: row.office_location,
                office_hours: row.office_hours,
                qualification: row.qualification,
                years_experience: row.years_experience,
            }),
        };

        Ok(Profile {
            id: row.id,
            account_id: row.account_id,
            phone_number: row.phone_number,
            birth_date: row.birth_date,
            bio: row.bio,
            avatar: row.avatar,
            details,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Listing row: profile columns plus the owning account
#[derive(Debug, Clone, sqlx::FromRow)]
struct ProfileListingRow {
    #[sqlx(flatten)]
    profile: ProfileRow,
    username: String,
    email: String,
    first_name: String,
    last_name: String,
    children_count: i64,
}

impl Profile {
    /// Finds the profile owned by an account
    pub async fn find_by_account(
        pool: &PgPool,
        account_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {} FROM profiles p WHERE p.account_id = $1",
            PROFILE_COLUMNS
        ))
        .bind(account_id)
        .fetch_optional(pool)
        .await?;

        row.map(Profile::try_from).transpose()
    }

    /// Finds a profile by its own ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {} FROM profiles p WHERE p.id = $1",
            PROFILE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        row.map(Profile::try_from).transpose()
    }

    /// Inserts an empty profile unless the account already has one
    ///
    /// Returns the stored profile either way.
    pub async fn get_or_create(pool: &PgPool, account_id: Uuid) -> Result<Self, sqlx::Error> {
        let empty = Profile::empty(account_id);
        sqlx::query(
            r#"
            INSERT INTO profiles (id, account_id, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (account_id) DO NOTHING
            "#,
        )
        .bind(empty.id)
        .bind(account_id)
        .bind(empty.role().as_str())
        .execute(pool)
        .await?;

        Self::find_by_account(pool, account_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Writes every column of an existing profile
    ///
    /// Columns belonging to other roles are reset so a role switch leaves no
    /// stale student or employee IDs behind.
    pub async fn save(pool: &PgPool, profile: &Profile) -> Result<Self, sqlx::Error> {
        let empty_student = StudentDetails::default();
        let empty_parent = ParentDetails::default();
        let empty_instructor = InstructorDetails::default();

        let (student, parent, instructor) = match &profile.details {
            RoleDetails::Student(s) => (Some(s), &empty_parent, &empty_instructor),
            RoleDetails::Parent(p) => (None, p, &empty_instructor),
            RoleDetails::Instructor(i) => (None, &empty_parent, i),
        };
        let instructor_id = match &profile.details {
            RoleDetails::Instructor(i) => Some(i.employee_id.clone()),
            _ => None,
        };
        let s = student.unwrap_or(&empty_student);

        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            r#"
            UPDATE profiles p SET
                role = $2, phone_number = $3, birth_date = $4, bio = $5, avatar = $6,
                student_id = $7, grade_level = $8, enrollment_date = $9, graduation_year = $10,
                gpa = $11, major = $12, parent_id = $13,
                occupation = $14, emergency_contact = $15, address = $16,
                employee_id = $17, department = $18, specialization = $19, hire_date = $20,
                office_location = $21, office_hours = $22, qualification = $23,
                years_experience = $24, updated_at = NOW()
            WHERE p.account_id = $1
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        ))
        .bind(profile.account_id)
        .bind(profile.role().as_str())
        .bind(&profile.phone_number)
        .bind(profile.birth_date)
        .bind(&profile.bio)
        .bind(&profile.avatar)
        .bind(student.map(|s| s.student_id.clone()))
        .bind(&s.grade_level)
        .bind(s.enrollment_date)
        .bind(s.graduation_year)
        .bind(s.gpa)
        .bind(&s.major)
        .bind(s.parent_id)
        .bind(&parent.occupation)
        .bind(&parent.emergency_contact)
        .bind(&parent.address)
        .bind(instructor_id)
        .bind(&instructor.department)
        .bind(&instructor.specialization)
        .bind(instructor.hire_date)
        .bind(&instructor.office_location)
        .bind(&instructor.office_hours)
        .bind(&instructor.qualification)
        .bind(instructor.years_experience)
        .fetch_optional(pool)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;

        Profile::try_from(row)
    }

    /// Lists all profiles of a role together with their accounts
    pub async fn list_by_role(
        pool: &PgPool,
        role: ProfileRole,
    ) -> Result<Vec<ProfileListing>, sqlx::Error> {
        let order = match role {
            ProfileRole::Student => "p.student_id",
            ProfileRole::Parent => "p.created_at",
            ProfileRole::Instructor => "p.employee_id",
        };

        let rows = sqlx::query_as::<_, ProfileListingRow>(&format!(
            r#"
            SELECT {},
                   a.username, a.email, a.first_name, a.last_name,
                   (SELECT COUNT(*) FROM profiles c WHERE c.parent_id = p.id) AS children_count
            FROM profiles p
            JOIN accounts a ON a.id = p.account_id
            WHERE p.role = $1
            ORDER BY {}
            "#,
            PROFILE_COLUMNS, order
        ))
        .bind(role.as_str())
        .fetch_all(pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let account = AccountSummary {
                    id: row.profile.account_id,
                    username: row.username,
                    email: row.email,
                    first_name: row.first_name,
                    last_name: row.last_name,
                };
                Ok(ProfileListing {
                    profile: Profile::try_from(row.profile)?,
                    account,
                    children_count: row.children_count,
                })
            })
            .collect()
    }

    /// Counts profiles per role
    pub async fn count_by_role(pool: &PgPool) -> Result<ProfileCounts, sqlx::Error> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT role, COUNT(*) FROM profiles GROUP BY role")
                .fetch_all(pool)
                .await?;

        let mut counts = ProfileCounts::default();
        for (role, n) in rows {
            if let Ok(role) = role.parse::<ProfileRole>() {
                counts.add(role, n);
            }
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn student(gpa: Option<f64>) -> Profile {
        let mut profile = Profile::empty(Uuid::new_v4());
        profile.details = RoleDetails::Student(StudentDetails {
            student_id: "S-001".to_string(),
            gpa,
            ..Default::default()
        });
        profile
    }

    #[test]
    fn test_empty_profile_is_parent() {
        let profile = Profile::empty(Uuid::new_v4());
        assert_eq!(profile.role(), ProfileRole::Parent);
        assert!(profile.validate(today()).is_ok());
    }

    #[test]
    fn test_phone_number_pattern() {
        let mut profile = Profile::empty(Uuid::new_v4());
        for valid in ["+999999999", "123456789", "+1123456789012", ""] {
            profile.phone_number = valid.to_string();
            assert!(profile.validate(today()).is_ok(), "{} should be valid", valid);
        }
        for invalid in ["12345", "+12-345-6789", "phone", "+1234567890123456789"] {
            profile.phone_number = invalid.to_string();
            assert_eq!(
                profile.validate(today()),
                Err(ProfileValidationError::InvalidPhoneNumber {
                    field: "phone_number"
                }),
                "{} should be rejected",
                invalid
            );
        }
    }

    #[test]
    fn test_birth_date_not_in_future() {
        let mut profile = Profile::empty(Uuid::new_v4());
        profile.birth_date = Some(today());
        assert!(profile.validate(today()).is_ok());

        profile.birth_date = today().succ_opt();
        assert_eq!(
            profile.validate(today()),
            Err(ProfileValidationError::BirthDateInFuture)
        );
    }

    #[test]
    fn test_gpa_bounds() {
        assert!(student(None).validate(today()).is_ok());
        assert!(student(Some(0.0)).validate(today()).is_ok());
        assert!(student(Some(4.0)).validate(today()).is_ok());
        assert_eq!(
            student(Some(4.01)).validate(today()),
            Err(ProfileValidationError::GpaOutOfRange)
        );
        assert_eq!(
            student(Some(-0.5)).validate(today()),
            Err(ProfileValidationError::GpaOutOfRange)
        );
    }

    #[test]
    fn test_instructor_experience_and_id() {
        let mut profile = Profile::empty(Uuid::new_v4());
        profile.details = RoleDetails::Instructor(InstructorDetails {
            employee_id: "E-7".to_string(),
            years_experience: -1,
            ..Default::default()
        });
        assert_eq!(
            profile.validate(today()),
            Err(ProfileValidationError::NegativeExperience)
        );

        profile.details = RoleDetails::Instructor(InstructorDetails::default());
        let err = profile.validate(today()).unwrap_err();
        assert_eq!(err.field(), "employee_id");
    }

    #[test]
    fn test_age_on() {
        let mut profile = Profile::empty(Uuid::new_v4());
        assert_eq!(profile.age_on(today()), None);

        profile.birth_date = NaiveDate::from_ymd_opt(2000, 6, 16);
        assert_eq!(profile.age_on(today()), Some(24));

        profile.birth_date = NaiveDate::from_ymd_opt(2000, 6, 15);
        assert_eq!(profile.age_on(today()), Some(25));
    }

    #[test]
    fn test_changes_apply_role_defaults() {
        let mut profile = Profile::empty(Uuid::new_v4());
        let changes: ProfileChanges = serde_json::from_value(serde_json::json!({
            "bio": "Teaches analytical engines",
            "details": { "role": "instructor", "employee_id": "E-1", "years_experience": 3 }
        }))
        .unwrap();

        changes.apply(&mut profile, today());

        assert_eq!(profile.bio, "Teaches analytical engines");
        match &profile.details {
            RoleDetails::Instructor(i) => {
                assert_eq!(i.employee_id, "E-1");
                assert_eq!(i.hire_date, Some(today()));
            }
            other => panic!("expected instructor, got {:?}", other),
        }
    }

    #[test]
    fn test_changes_distinguish_null_from_missing() {
        let missing: ProfileChanges = serde_json::from_str(r#"{"bio": "x"}"#).unwrap();
        assert_eq!(missing.birth_date, None);

        let cleared: ProfileChanges = serde_json::from_str(r#"{"birth_date": null}"#).unwrap();
        assert_eq!(cleared.birth_date, Some(None));
        assert!(!cleared.is_empty());
    }

    #[test]
    fn test_profile_serializes_role_inline() {
        let json = serde_json::to_value(student(Some(3.5))).unwrap();
        assert_eq!(json["role"], "student");
        assert_eq!(json["student_id"], "S-001");
        assert_eq!(json["gpa"], 3.5);
    }

    #[test]
    fn test_role_round_trip_through_str() {
        for role in ProfileRole::ALL {
            assert_eq!(role.as_str().parse::<ProfileRole>(), Ok(role));
        }
        assert!("admin".parse::<ProfileRole>().is_err());
    }
}
