use axum::{extract::State, routing::post, Json, Router};

use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::models::student::{CreateStudentData, Student};

async fn create_student(
    State(state): State<AppState>,
    Json(data): Json<CreateStudentData>,
) -> Result<Json<Student>> {
    if data.first_name.trim().is_empty() || data.last_name.trim().is_empty() {
        return Err(AppError::Validation("student name must not be empty".to_string()));
    }

    let student = Student::create(&state.pool, data).await?;
    Ok(Json(student))
}

async fn list_students(State(state): State<AppState>) -> Result<Json<Vec<Student>>> {
    let students = Student::list(&state.pool).await?;
    Ok(Json(students))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/students", post(create_student).get(list_students))
}
