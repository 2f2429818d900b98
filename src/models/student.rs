use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Student {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub course: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateStudentData {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub course: Option<String>,
}

impl Student {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub async fn create(
        executor: impl PgExecutor<'_>,
        data: CreateStudentData,
    ) -> Result<Self, sqlx::Error> {
        let student = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO students (first_name, last_name, email, course)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(&data.email)
        .bind(&data.course)
        .fetch_one(executor)
        .await?;

        Ok(student)
    }

    pub async fn find_by_id(
        executor: impl PgExecutor<'_>,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let student = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM students WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(student)
    }

    pub async fn list(executor: impl PgExecutor<'_>) -> Result<Vec<Self>, sqlx::Error> {
        let students = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM students ORDER BY last_name, first_name
            "#,
        )
        .fetch_all(executor)
        .await?;

        Ok(students)
    }
}
