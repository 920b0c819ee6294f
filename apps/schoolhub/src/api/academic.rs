//! Academic years, classes, sections and subjects.

use super::{ApiResult, AppState, AuthUser, Body, done};
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use schoolhub_core::Reader;
use schoolhub_core::academic::{
    self, AcademicYear, AcademicYearInput, ClassInput, SchoolClass, Section, SectionInput,
    Subject, SubjectInput,
};
use serde_json::Value;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/years", get(list_years).post(create_year))
        .route("/years/active", get(active_year))
        .route("/years/{id}", get(get_year).put(update_year).delete(delete_year))
        .route("/classes", get(list_classes).post(create_class))
        .route(
            "/classes/{id}",
            get(get_class).put(update_class).delete(delete_class),
        )
        .route("/sections", get(list_sections).post(create_section))
        .route("/sections/class/{id}", get(sections_by_class))
        .route("/sections/{id}", get(get_section).put(update_section).delete(delete_section))
        .route("/subjects", get(list_subjects).post(create_subject))
        .route(
            "/subjects/{id}",
            get(get_subject).put(update_subject).delete(delete_subject),
        )
}

// =============================================================================
// ACADEMIC YEARS
// =============================================================================

async fn list_years(State(s): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<AcademicYear>>> {
    user.staff()?;
    Ok(Json(s.read(|r| r.list::<AcademicYear>()).await?))
}

async fn active_year(
    State(s): State<AppState>,
    _user: AuthUser,
) -> ApiResult<Json<Option<AcademicYear>>> {
    Ok(Json(s.read(|r| academic::active_year(r)).await?))
}

async fn get_year(
    State(s): State<AppState>,
    user: AuthUser,
    Path(id): Path<u64>,
) -> ApiResult<Json<AcademicYear>> {
    user.staff()?;
    Ok(Json(s.read(move |r| r.fetch::<AcademicYear>(id)).await?))
}

async fn create_year(
    State(s): State<AppState>,
    user: AuthUser,
    Body(input): Body<AcademicYearInput>,
) -> ApiResult<Json<AcademicYear>> {
    user.admin()?;
    Ok(Json(s.write(move |tx| academic::create_year(tx, input)).await?))
}

async fn update_year(
    State(s): State<AppState>,
    user: AuthUser,
    Path(id): Path<u64>,
    Body(input): Body<AcademicYearInput>,
) -> ApiResult<Json<AcademicYear>> {
    user.admin()?;
    Ok(Json(s.write(move |tx| academic::update_year(tx, id, input)).await?))
}

async fn delete_year(
    State(s): State<AppState>,
    user: AuthUser,
    Path(id): Path<u64>,
) -> ApiResult<Json<Value>> {
    user.admin()?;
    s.write(move |tx| academic::delete_year(tx, id)).await?;
    Ok(done("Academic year deleted successfully"))
}

// =============================================================================
// CLASSES
// =============================================================================

async fn list_classes(State(s): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<SchoolClass>>> {
    user.staff()?;
    Ok(Json(s.read(|r| r.list::<SchoolClass>()).await?))
}

async fn get_class(
    State(s): State<AppState>,
    user: AuthUser,
    Path(id): Path<u64>,
) -> ApiResult<Json<SchoolClass>> {
    user.staff()?;
    Ok(Json(s.read(move |r| r.fetch::<SchoolClass>(id)).await?))
}

async fn create_class(
    State(s): State<AppState>,
    user: AuthUser,
    Body(input): Body<ClassInput>,
) -> ApiResult<Json<SchoolClass>> {
    user.admin()?;
    Ok(Json(s.write(move |tx| academic::create_class(tx, input)).await?))
}

async fn update_class(
    State(s): State<AppState>,
    user: AuthUser,
    Path(id): Path<u64>,
    Body(input): Body<ClassInput>,
) -> ApiResult<Json<SchoolClass>> {
    user.admin()?;
    Ok(Json(s.write(move |tx| academic::update_class(tx, id, input)).await?))
}

async fn delete_class(
    State(s): State<AppState>,
    user: AuthUser,
    Path(id): Path<u64>,
) -> ApiResult<Json<Value>> {
    user.admin()?;
    s.write(move |tx| academic::delete_class(tx, id)).await?;
    Ok(done("Class deleted successfully"))
}

// =============================================================================
// SECTIONS
// =============================================================================

async fn list_sections(State(s): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<Section>>> {
    user.staff()?;
    Ok(Json(s.read(|r| r.list::<Section>()).await?))
}

async fn sections_by_class(
    State(s): State<AppState>,
    user: AuthUser,
    Path(class_id): Path<u64>,
) -> ApiResult<Json<Vec<Section>>> {
    user.staff()?;
    Ok(Json(s.read(move |r| academic::sections_by_class(r, class_id)).await?))
}

async fn get_section(
    State(s): State<AppState>,
    user: AuthUser,
    Path(id): Path<u64>,
) -> ApiResult<Json<Section>> {
    user.staff()?;
    Ok(Json(s.read(move |r| r.fetch::<Section>(id)).await?))
}

async fn create_section(
    State(s): State<AppState>,
    user: AuthUser,
    Body(input): Body<SectionInput>,
) -> ApiResult<Json<Section>> {
    user.admin()?;
    Ok(Json(s.write(move |tx| academic::create_section(tx, input)).await?))
}

async fn update_section(
    State(s): State<AppState>,
    user: AuthUser,
    Path(id): Path<u64>,
    Body(input): Body<SectionInput>,
) -> ApiResult<Json<Section>> {
    user.admin()?;
    Ok(Json(s.write(move |tx| academic::update_section(tx, id, input)).await?))
}

async fn delete_section(
    State(s): State<AppState>,
    user: AuthUser,
    Path(id): Path<u64>,
) -> ApiResult<Json<Value>> {
    user.admin()?;
    s.write(move |tx| academic::delete_section(tx, id)).await?;
    Ok(done("Section deleted successfully"))
}

// =============================================================================
// SUBJECTS
// =============================================================================

async fn list_subjects(State(s): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<Subject>>> {
    user.staff()?;
    Ok(Json(s.read(|r| r.list::<Subject>()).await?))
}

async fn get_subject(
    State(s): State<AppState>,
    user: AuthUser,
    Path(id): Path<u64>,
) -> ApiResult<Json<Subject>> {
    user.staff()?;
    Ok(Json(s.read(move |r| r.fetch::<Subject>(id)).await?))
}

async fn create_subject(
    State(s): State<AppState>,
    user: AuthUser,
    Body(input): Body<SubjectInput>,
) -> ApiResult<Json<Subject>> {
    user.admin()?;
    Ok(Json(s.write(move |tx| academic::create_subject(tx, input)).await?))
}

async fn update_subject(
    State(s): State<AppState>,
    user: AuthUser,
    Path(id): Path<u64>,
    Body(input): Body<SubjectInput>,
) -> ApiResult<Json<Subject>> {
    user.admin()?;
    Ok(Json(s.write(move |tx| academic::update_subject(tx, id, input)).await?))
}

async fn delete_subject(
    State(s): State<AppState>,
    user: AuthUser,
    Path(id): Path<u64>,
) -> ApiResult<Json<Value>> {
    user.admin()?;
    s.write(move |tx| academic::delete_subject(tx, id)).await?;
    Ok(done("Subject deleted successfully"))
}
