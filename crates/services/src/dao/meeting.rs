use bson::{DateTime, doc, oid::ObjectId};
use mongodb::Database;
use rollcall_db::models::{Meeting, MeetingStatus};

use super::base::{BaseDao, DaoError, DaoResult, PaginatedResult, PaginationParams};

/// Aggregate store for meetings. Reads and writes operate on the entire
/// document, embedded attendance sessions included; the lifecycle engine
/// serializes writers per meeting on top of this.
pub struct MeetingDao {
    pub base: BaseDao<Meeting>,
}

impl MeetingDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Meeting::COLLECTION),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        created_by: ObjectId,
        title: String,
        course_id: Option<ObjectId>,
        lecturer_id: Option<ObjectId>,
        scheduled_at: Option<DateTime>,
        duration_minutes: Option<u32>,
    ) -> DaoResult<Meeting> {
        let now = DateTime::now();

        let meeting = Meeting {
            id: None,
            room_id: generate_room_id(),
            title,
            course_id,
            lecturer_id,
            created_by,
            status: MeetingStatus::Scheduled,
            scheduled_at,
            duration_minutes,
            participants: Vec::new(),
            attendance_sessions: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        let id = self.base.insert_one(&meeting).await?;
        self.base.find_by_id(id).await
    }

    pub async fn load(&self, meeting_id: ObjectId) -> DaoResult<Meeting> {
        self.base.find_by_id(meeting_id).await
    }

    /// Persist the full aggregate. Bumps `updated_at` on the way out.
    pub async fn save(&self, meeting: &mut Meeting) -> DaoResult<()> {
        let id = meeting
            .id
            .ok_or_else(|| DaoError::Validation("meeting has no id".to_string()))?;
        meeting.updated_at = DateTime::now();

        if !self.base.replace_by_id(id, meeting).await? {
            return Err(DaoError::NotFound);
        }
        Ok(())
    }

    pub async fn start(&self, meeting_id: ObjectId) -> DaoResult<bool> {
        self.base
            .update_by_id(meeting_id, doc! { "$set": { "status": "active" } })
            .await
    }

    pub async fn list_for_user(
        &self,
        user_id: ObjectId,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<Meeting>> {
        self.base
            .find_paginated(
                doc! { "$or": [ { "created_by": user_id }, { "participants": user_id } ] },
                Some(doc! { "created_at": -1 }),
                params,
            )
            .await
    }

    /// Deleting the meeting deletes its sessions with it; they have no
    /// existence outside the aggregate.
    pub async fn delete(&self, meeting_id: ObjectId) -> DaoResult<bool> {
        Ok(self.base.hard_delete(doc! { "_id": meeting_id }).await? > 0)
    }
}

fn generate_room_id() -> String {
    nanoid::nanoid!(10)
}
