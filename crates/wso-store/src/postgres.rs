// SPDX-License-Identifier: MIT

//! Postgres `Store` adapter via `sqlx`, the production repository for
//! workshops, seats, worker VMs, registrations, and users (spec.md §4.3,
//! §6 persisted state layout). Migrations are embedded with
//! `sqlx::migrate!` and applied at startup (SPEC_FULL.md §4.3 addition) —
//! an ambient concern, not a feature.
//!
//! Queries use the runtime-checked `sqlx::query`/`query_as` forms rather
//! than the compile-time `query!` macros: this adapter must build without a
//! live database reachable at compile time.

use crate::port::Store;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool, Row};
use wso_core::{
    Registration, RegistrationId, RegistrationStatus, Seat, SeatKey, SeatStatus, User, VmRecordId, WorkerVm,
    WorkerVmStatus, Workshop, WorkshopId, WorkshopStatus,
};
use wso_core::{CoreError, RuntimeType, UserId};

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect and run embedded migrations. Called once at CP startup.
    pub async fn connect(database_url: &str) -> Result<Self, CoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| CoreError::UpstreamUnavailable(format!("postgres connect failed: {e}")))?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| CoreError::Internal(format!("migration failed: {e}")))?;
        Ok(Self { pool })
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_err(op: &'static str, e: sqlx::Error) -> CoreError {
    CoreError::Internal(format!("store: {op}: {e}"))
}

fn runtime_type_to_str(rt: RuntimeType) -> &'static str {
    match rt {
        RuntimeType::Docker => "docker",
        RuntimeType::Firecracker => "firecracker",
    }
}

fn runtime_type_from_str(s: &str) -> RuntimeType {
    match s {
        "firecracker" => RuntimeType::Firecracker,
        _ => RuntimeType::Docker,
    }
}

fn workshop_status_to_str(s: WorkshopStatus) -> &'static str {
    match s {
        WorkshopStatus::Created => "created",
        WorkshopStatus::Provisioning => "provisioning",
        WorkshopStatus::Running => "running",
        WorkshopStatus::Stopping => "stopping",
        WorkshopStatus::Deleting => "deleting",
        WorkshopStatus::Stopped => "stopped",
        WorkshopStatus::Deleted => "deleted",
        WorkshopStatus::Error => "error",
    }
}

fn workshop_status_from_str(s: &str) -> WorkshopStatus {
    match s {
        "provisioning" => WorkshopStatus::Provisioning,
        "running" => WorkshopStatus::Running,
        "stopping" => WorkshopStatus::Stopping,
        "deleting" => WorkshopStatus::Deleting,
        "stopped" => WorkshopStatus::Stopped,
        "deleted" => WorkshopStatus::Deleted,
        "error" => WorkshopStatus::Error,
        _ => WorkshopStatus::Created,
    }
}

fn seat_status_to_str(s: SeatStatus) -> &'static str {
    match s {
        SeatStatus::Pending => "pending",
        SeatStatus::Ready => "ready",
        SeatStatus::Occupied => "occupied",
    }
}

fn seat_status_from_str(s: &str) -> SeatStatus {
    match s {
        "ready" => SeatStatus::Ready,
        "occupied" => SeatStatus::Occupied,
        _ => SeatStatus::Pending,
    }
}

fn vm_status_to_str(s: WorkerVmStatus) -> &'static str {
    match s {
        WorkerVmStatus::Provisioning => "provisioning",
        WorkerVmStatus::Running => "running",
        WorkerVmStatus::Removed => "removed",
    }
}

fn vm_status_from_str(s: &str) -> WorkerVmStatus {
    match s {
        "running" => WorkerVmStatus::Running,
        "removed" => WorkerVmStatus::Removed,
        _ => WorkerVmStatus::Provisioning,
    }
}

fn registration_status_to_str(s: RegistrationStatus) -> &'static str {
    match s {
        RegistrationStatus::Registered => "registered",
        RegistrationStatus::Active => "active",
    }
}

fn registration_status_from_str(s: &str) -> RegistrationStatus {
    match s {
        "active" => RegistrationStatus::Active,
        _ => RegistrationStatus::Registered,
    }
}

#[derive(FromRow)]
struct WorkshopRow {
    id: String,
    name: String,
    code: String,
    seats: i32,
    owner_id: String,
    runtime_type: String,
    status: String,
    created_at_ms: i64,
}

impl From<WorkshopRow> for Workshop {
    fn from(r: WorkshopRow) -> Self {
        Workshop {
            id: WorkshopId::from_string(r.id),
            name: r.name,
            code: r.code,
            seats: r.seats as u32,
            owner_id: UserId::from_string(r.owner_id),
            runtime_type: runtime_type_from_str(&r.runtime_type),
            status: workshop_status_from_str(&r.status),
            created_at_ms: r.created_at_ms as u64,
        }
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn create_workshop(&self, workshop: Workshop) -> Result<(), CoreError> {
        sqlx::query(
            "INSERT INTO workshops (id, name, code, seats, owner_id, runtime_type, status, created_at_ms) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(workshop.id.as_str())
        .bind(&workshop.name)
        .bind(&workshop.code)
        .bind(workshop.seats as i32)
        .bind(workshop.owner_id.as_str())
        .bind(runtime_type_to_str(workshop.runtime_type))
        .bind(workshop_status_to_str(workshop.status))
        .bind(workshop.created_at_ms as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                CoreError::conflict(format!("workshop {} already exists", workshop.id))
            }
            other => db_err("create_workshop", other),
        })?;
        Ok(())
    }

    async fn get_workshop(&self, id: &WorkshopId) -> Result<Option<Workshop>, CoreError> {
        let row: Option<WorkshopRow> = sqlx::query_as(
            "SELECT id, name, code, seats, owner_id, runtime_type, status, created_at_ms \
             FROM workshops WHERE id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_err("get_workshop", e))?;
        Ok(row.map(Workshop::from))
    }

    async fn list_workshops(&self, owner: Option<&str>) -> Result<Vec<Workshop>, CoreError> {
        let rows: Vec<WorkshopRow> = match owner {
            Some(owner_id) => sqlx::query_as(
                "SELECT id, name, code, seats, owner_id, runtime_type, status, created_at_ms \
                 FROM workshops WHERE owner_id = $1 ORDER BY created_at_ms",
            )
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await,
            None => sqlx::query_as(
                "SELECT id, name, code, seats, owner_id, runtime_type, status, created_at_ms \
                 FROM workshops ORDER BY created_at_ms",
            )
            .fetch_all(&self.pool)
            .await,
        }
        .map_err(|e| db_err("list_workshops", e))?;
        Ok(rows.into_iter().map(Workshop::from).collect())
    }

    async fn update_workshop_status(
        &self,
        id: &WorkshopId,
        expected: WorkshopStatus,
        next: WorkshopStatus,
    ) -> Result<bool, CoreError> {
        let mut tx = self.pool.begin().await.map_err(|e| db_err("update_workshop_status:begin", e))?;
        let current: Option<(String,)> = sqlx::query_as("SELECT status FROM workshops WHERE id = $1 FOR UPDATE")
            .bind(id.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| db_err("update_workshop_status:select", e))?;
        let Some((current,)) = current else {
            return Err(CoreError::not_found(format!("workshop {id}")));
        };
        if workshop_status_from_str(&current) != expected {
            tx.rollback().await.map_err(|e| db_err("update_workshop_status:rollback", e))?;
            return Ok(false);
        }
        sqlx::query("UPDATE workshops SET status = $1 WHERE id = $2")
            .bind(workshop_status_to_str(next))
            .bind(id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| db_err("update_workshop_status:update", e))?;
        tx.commit().await.map_err(|e| db_err("update_workshop_status:commit", e))?;
        Ok(true)
    }

    async fn update_tunnel_url(&self, id: &WorkshopId, tunnel_url: String) -> Result<(), CoreError> {
        let result = sqlx::query("UPDATE workshop_vms SET tunnel_url = $1 WHERE workshop_id = $2")
            .bind(&tunnel_url)
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| db_err("update_tunnel_url", e))?;
        if result.rows_affected() == 0 {
            return Err(CoreError::not_found(format!("worker vm for workshop {id}")));
        }
        Ok(())
    }

    async fn create_seats(&self, workshop_id: &WorkshopId, count: u32) -> Result<(), CoreError> {
        let mut tx = self.pool.begin().await.map_err(|e| db_err("create_seats:begin", e))?;
        for seat_id in 1..=count {
            sqlx::query(
                "INSERT INTO sessions (workshop_id, seat_id, status) VALUES ($1, $2, $3) \
                 ON CONFLICT (workshop_id, seat_id) DO NOTHING",
            )
            .bind(workshop_id.as_str())
            .bind(seat_id as i32)
            .bind(seat_status_to_str(SeatStatus::Pending))
            .execute(&mut *tx)
            .await
            .map_err(|e| db_err("create_seats:insert", e))?;
        }
        tx.commit().await.map_err(|e| db_err("create_seats:commit", e))?;
        Ok(())
    }

    async fn get_seat(&self, key: SeatKey) -> Result<Option<Seat>, CoreError> {
        let row = sqlx::query(
            "SELECT workshop_id, seat_id, reconnect_hash, learner_name, status, ip, container_id \
             FROM sessions WHERE workshop_id = $1 AND seat_id = $2",
        )
        .bind(key.workshop_id.as_str())
        .bind(key.seat_id as i32)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_err("get_seat", e))?;
        Ok(row.map(seat_from_row))
    }

    async fn list_seats(&self, workshop_id: &WorkshopId) -> Result<Vec<Seat>, CoreError> {
        let rows = sqlx::query(
            "SELECT workshop_id, seat_id, reconnect_hash, learner_name, status, ip, container_id \
             FROM sessions WHERE workshop_id = $1 ORDER BY seat_id",
        )
        .bind(workshop_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_err("list_seats", e))?;
        Ok(rows.into_iter().map(seat_from_row).collect())
    }

    async fn update_seat(&self, seat: Seat) -> Result<(), CoreError> {
        sqlx::query(
            "UPDATE sessions SET reconnect_hash = $1, learner_name = $2, status = $3, ip = $4, container_id = $5 \
             WHERE workshop_id = $6 AND seat_id = $7",
        )
        .bind(&seat.reconnect_hash)
        .bind(&seat.learner_name)
        .bind(seat_status_to_str(seat.status))
        .bind(&seat.ip)
        .bind(&seat.container_id)
        .bind(seat.workshop_id.as_str())
        .bind(seat.seat_id as i32)
        .execute(&self.pool)
        .await
        .map_err(|e| db_err("update_seat", e))?;
        Ok(())
    }

    async fn create_worker_vm(&self, vm: WorkerVm) -> Result<(), CoreError> {
        sqlx::query(
            "INSERT INTO workshop_vms (id, workshop_id, vm_name, vm_id, zone, machine_type, external_ip, \
             internal_ip, status, ssh_public_key, ssh_private_key, provisioning_started_at_ms, \
             provisioning_completed_at_ms, provisioning_duration_ms, tunnel_url, created_at_ms, updated_at_ms) \
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17)",
        )
        .bind(vm.id.as_str())
        .bind(vm.workshop_id.as_str())
        .bind(&vm.vm_name)
        .bind(&vm.vm_id)
        .bind(&vm.zone)
        .bind(&vm.machine_type)
        .bind(&vm.external_ip)
        .bind(&vm.internal_ip)
        .bind(vm_status_to_str(vm.status))
        .bind(&vm.ssh_public_key)
        .bind(&vm.ssh_private_key)
        .bind(vm.provisioning_started_at_ms.map(|v| v as i64))
        .bind(vm.provisioning_completed_at_ms.map(|v| v as i64))
        .bind(vm.provisioning_duration_ms.map(|v| v as i64))
        .bind(&vm.tunnel_url)
        .bind(vm.created_at_ms as i64)
        .bind(vm.updated_at_ms as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| db_err("create_worker_vm", e))?;
        Ok(())
    }

    async fn get_worker_vm(&self, workshop_id: &WorkshopId) -> Result<Option<WorkerVm>, CoreError> {
        let row = sqlx::query(
            "SELECT id, workshop_id, vm_name, vm_id, zone, machine_type, external_ip, internal_ip, status, \
             ssh_public_key, ssh_private_key, provisioning_started_at_ms, provisioning_completed_at_ms, \
             provisioning_duration_ms, tunnel_url, created_at_ms, updated_at_ms \
             FROM workshop_vms WHERE workshop_id = $1",
        )
        .bind(workshop_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_err("get_worker_vm", e))?;
        Ok(row.map(worker_vm_from_row))
    }

    async fn list_worker_vms(&self) -> Result<Vec<WorkerVm>, CoreError> {
        let rows = sqlx::query(
            "SELECT id, workshop_id, vm_name, vm_id, zone, machine_type, external_ip, internal_ip, status, \
             ssh_public_key, ssh_private_key, provisioning_started_at_ms, provisioning_completed_at_ms, \
             provisioning_duration_ms, tunnel_url, created_at_ms, updated_at_ms \
             FROM workshop_vms",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_err("list_worker_vms", e))?;
        Ok(rows.into_iter().map(worker_vm_from_row).collect())
    }

    async fn update_worker_vm(&self, vm: WorkerVm) -> Result<(), CoreError> {
        sqlx::query(
            "UPDATE workshop_vms SET external_ip = $1, internal_ip = $2, status = $3, \
             provisioning_completed_at_ms = $4, provisioning_duration_ms = $5, tunnel_url = $6, \
             updated_at_ms = $7 WHERE workshop_id = $8",
        )
        .bind(&vm.external_ip)
        .bind(&vm.internal_ip)
        .bind(vm_status_to_str(vm.status))
        .bind(vm.provisioning_completed_at_ms.map(|v| v as i64))
        .bind(vm.provisioning_duration_ms.map(|v| v as i64))
        .bind(&vm.tunnel_url)
        .bind(vm.updated_at_ms as i64)
        .bind(vm.workshop_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| db_err("update_worker_vm", e))?;
        Ok(())
    }

    async fn mark_worker_vm_removed(&self, workshop_id: &WorkshopId, now_ms: u64) -> Result<(), CoreError> {
        sqlx::query("UPDATE workshop_vms SET status = $1, updated_at_ms = $2 WHERE workshop_id = $3")
            .bind(vm_status_to_str(WorkerVmStatus::Removed))
            .bind(now_ms as i64)
            .bind(workshop_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| db_err("mark_worker_vm_removed", e))?;
        Ok(())
    }

    async fn get_worker_vm_private_key(&self, workshop_id: &WorkshopId) -> Result<Option<String>, CoreError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT ssh_private_key FROM workshop_vms WHERE workshop_id = $1")
                .bind(workshop_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_err("get_worker_vm_private_key", e))?;
        Ok(row.map(|(k,)| k))
    }

    async fn create_registration(&self, registration: Registration) -> Result<(), CoreError> {
        sqlx::query(
            "INSERT INTO registrations (id, workshop_id, email, access_code, seat_id, status) \
             VALUES ($1,$2,$3,$4,$5,$6)",
        )
        .bind(registration.id.as_str())
        .bind(registration.workshop_id.as_str())
        .bind(&registration.email)
        .bind(&registration.access_code)
        .bind(registration.seat_id.map(|s| s as i32))
        .bind(registration_status_to_str(registration.status))
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                CoreError::conflict("registration already exists for this workshop/email")
            }
            other => db_err("create_registration", other),
        })?;
        Ok(())
    }

    async fn get_registration_by_access_code(&self, access_code: &str) -> Result<Option<Registration>, CoreError> {
        let row = sqlx::query(
            "SELECT id, workshop_id, email, access_code, seat_id, status FROM registrations WHERE access_code = $1",
        )
        .bind(access_code)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_err("get_registration_by_access_code", e))?;
        Ok(row.map(registration_from_row))
    }

    async fn get_registration_by_email(
        &self,
        workshop_id: &WorkshopId,
        email: &str,
    ) -> Result<Option<Registration>, CoreError> {
        let row = sqlx::query(
            "SELECT id, workshop_id, email, access_code, seat_id, status FROM registrations \
             WHERE workshop_id = $1 AND email = $2",
        )
        .bind(workshop_id.as_str())
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_err("get_registration_by_email", e))?;
        Ok(row.map(registration_from_row))
    }

    async fn count_registrations(&self, workshop_id: &WorkshopId) -> Result<u64, CoreError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM registrations WHERE workshop_id = $1")
            .bind(workshop_id.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_err("count_registrations", e))?;
        Ok(row.0 as u64)
    }

    async fn update_registration(&self, registration: Registration) -> Result<(), CoreError> {
        sqlx::query("UPDATE registrations SET seat_id = $1, status = $2 WHERE id = $3")
            .bind(registration.seat_id.map(|s| s as i32))
            .bind(registration_status_to_str(registration.status))
            .bind(registration.id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| db_err("update_registration", e))?;
        Ok(())
    }

    async fn create_user(&self, user: User) -> Result<(), CoreError> {
        sqlx::query("INSERT INTO users (id, email, is_admin) VALUES ($1, $2, $3)")
            .bind(user.id.as_str())
            .bind(&user.email)
            .bind(user.is_admin)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    CoreError::conflict(format!("user {} already exists", user.email))
                }
                other => db_err("create_user", other),
            })?;
        Ok(())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, CoreError> {
        let row: Option<(String, String, bool)> =
            sqlx::query_as("SELECT id, email, is_admin FROM users WHERE email = $1")
                .bind(email)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_err("get_user_by_email", e))?;
        Ok(row.map(|(id, email, is_admin)| User { id: UserId::from_string(id), email, is_admin }))
    }

    async fn list_users(&self) -> Result<Vec<User>, CoreError> {
        let rows: Vec<(String, String, bool)> = sqlx::query_as("SELECT id, email, is_admin FROM users")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_err("list_users", e))?;
        Ok(rows.into_iter().map(|(id, email, is_admin)| User { id: UserId::from_string(id), email, is_admin }).collect())
    }

    async fn health_check(&self) -> Result<(), CoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| CoreError::UpstreamUnavailable(format!("store health check failed: {e}")))?;
        Ok(())
    }
}

fn seat_from_row(row: sqlx::postgres::PgRow) -> Seat {
    let status: String = row.get("status");
    Seat {
        workshop_id: WorkshopId::from_string(row.get::<String, _>("workshop_id")),
        seat_id: row.get::<i32, _>("seat_id") as u32,
        reconnect_hash: row.get("reconnect_hash"),
        learner_name: row.get("learner_name"),
        status: seat_status_from_str(&status),
        ip: row.get("ip"),
        container_id: row.get("container_id"),
    }
}

fn worker_vm_from_row(row: sqlx::postgres::PgRow) -> WorkerVm {
    let status: String = row.get("status");
    WorkerVm {
        id: VmRecordId::from_string(row.get::<String, _>("id")),
        workshop_id: WorkshopId::from_string(row.get::<String, _>("workshop_id")),
        vm_name: row.get("vm_name"),
        vm_id: row.get("vm_id"),
        zone: row.get("zone"),
        machine_type: row.get("machine_type"),
        external_ip: row.get("external_ip"),
        internal_ip: row.get("internal_ip"),
        status: vm_status_from_str(&status),
        ssh_public_key: row.get("ssh_public_key"),
        ssh_private_key: row.get("ssh_private_key"),
        provisioning_started_at_ms: row.get::<Option<i64>, _>("provisioning_started_at_ms").map(|v| v as u64),
        provisioning_completed_at_ms: row.get::<Option<i64>, _>("provisioning_completed_at_ms").map(|v| v as u64),
        provisioning_duration_ms: row.get::<Option<i64>, _>("provisioning_duration_ms").map(|v| v as u64),
        tunnel_url: row.get("tunnel_url"),
        created_at_ms: row.get::<i64, _>("created_at_ms") as u64,
        updated_at_ms: row.get::<i64, _>("updated_at_ms") as u64,
    }
}

fn registration_from_row(row: sqlx::postgres::PgRow) -> Registration {
    let status: String = row.get("status");
    Registration {
        id: RegistrationId::from_string(row.get::<String, _>("id")),
        workshop_id: WorkshopId::from_string(row.get::<String, _>("workshop_id")),
        email: row.get("email"),
        access_code: row.get("access_code"),
        seat_id: row.get::<Option<i32>, _>("seat_id").map(|v| v as u32),
        status: registration_status_from_str(&status),
    }
}
