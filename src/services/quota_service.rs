use crate::config::GenerationConfig;
use crate::entities::{generation_entity as generations, user_entity as users, GenerationStatus, VipLevel};
use crate::error::{AppError, AppResult};
use crate::models::QuotaResponse;
use chrono::{DateTime, Local, TimeZone, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QuerySelect, Set, TransactionTrait,
};

/// 配额判定用的生效等级: 过期时间已过则一律按 NORMAL,
/// 存储的等级字段过期后不再可信, 每次判定都重新计算。
pub fn effective_vip_level(
    vip_level: VipLevel,
    vip_expire_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> VipLevel {
    match vip_expire_at {
        Some(expire_at) if expire_at < now => VipLevel::Normal,
        _ => vip_level,
    }
}

/// 已用量达到限额即拒绝, 拒绝原因同时携带两个数字
pub(crate) fn check_quota(used: i64, limit: i64) -> AppResult<()> {
    if used >= limit {
        return Err(AppError::QuotaExceeded { used, limit });
    }
    Ok(())
}

/// 今日起点: 服务器本地日历日 00:00:00, 不是 UTC 也不是滚动 24 小时
pub fn start_of_local_day() -> DateTime<Utc> {
    let today = Local::now().date_naive();
    let midnight = today.and_hms_opt(0, 0, 0).unwrap();
    match Local.from_local_datetime(&midnight).earliest() {
        Some(local) => local.with_timezone(&Utc),
        None => Utc::now(),
    }
}

#[derive(Clone)]
pub struct QuotaService {
    pool: DatabaseConnection,
    config: GenerationConfig,
}

impl QuotaService {
    pub fn new(pool: DatabaseConnection, config: GenerationConfig) -> Self {
        Self { pool, config }
    }

    pub fn daily_limit(&self, vip_level: VipLevel) -> i64 {
        match vip_level {
            VipLevel::Normal => self.config.daily_limit_normal,
            VipLevel::Vip => self.config.daily_limit_vip,
            VipLevel::Svip => self.config.daily_limit_svip,
        }
    }

    pub async fn today_count(&self, user_id: i64) -> AppResult<i64> {
        self.today_count_on(&self.pool, user_id).await
    }

    async fn today_count_on<C: ConnectionTrait>(&self, conn: &C, user_id: i64) -> AppResult<i64> {
        let count = generations::Entity::find()
            .filter(generations::Column::UserId.eq(user_id))
            .filter(generations::Column::CreatedAt.gte(start_of_local_day()))
            .count(conn)
            .await?;
        Ok(count as i64)
    }

    /// 非锁定的预检。失败关闭: 用户不存在即不可生成。
    pub async fn can_generate(&self, user_id: i64) -> AppResult<()> {
        let user = users::Entity::find_by_id(user_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let level = effective_vip_level(user.vip_level, user.vip_expire_at, Utc::now());
        let limit = self.daily_limit(level);
        let used = self.today_count(user_id).await?;

        check_quota(used, limit)
    }

    /// 原子配额占位: 同一事务内锁定用户行 → 计数 → 插入 PENDING 记录,
    /// 两个并发请求不可能同时通过检查。返回占位的生成记录。
    pub async fn reserve(
        &self,
        user_id: i64,
        prompt: String,
        params: Option<serde_json::Value>,
    ) -> AppResult<generations::Model> {
        let txn = self.pool.begin().await?;

        let user = users::Entity::find_by_id(user_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let level = effective_vip_level(user.vip_level, user.vip_expire_at, Utc::now());
        let limit = self.daily_limit(level);
        let used = self.today_count_on(&txn, user_id).await?;

        check_quota(used, limit)?;

        let generation = generations::ActiveModel {
            user_id: Set(user_id),
            prompt: Set(prompt),
            status: Set(GenerationStatus::Pending),
            params: Set(params),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        Ok(generation)
    }

    /// 配额概览 (生效等级、限额、今日已用/剩余、历史总量)
    pub async fn stats(&self, user_id: i64) -> AppResult<QuotaResponse> {
        let user = users::Entity::find_by_id(user_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let level = effective_vip_level(user.vip_level, user.vip_expire_at, Utc::now());
        let daily_limit = self.daily_limit(level);
        let today_used = self.today_count(user_id).await?;

        let total_generations = generations::Entity::find()
            .filter(generations::Column::UserId.eq(user_id))
            .count(&self.pool)
            .await? as i64;

        Ok(QuotaResponse {
            vip_level: level,
            daily_limit,
            today_used,
            today_remaining: (daily_limit - today_used).max(0),
            total_generations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_expired_vip_downgrades_to_normal() {
        let now = Utc::now();
        let expired = Some(now - Duration::seconds(1));
        assert_eq!(
            effective_vip_level(VipLevel::Svip, expired, now),
            VipLevel::Normal
        );
        assert_eq!(
            effective_vip_level(VipLevel::Vip, expired, now),
            VipLevel::Normal
        );
    }

    #[test]
    fn test_unexpired_vip_keeps_stored_level() {
        let now = Utc::now();
        let future = Some(now + Duration::days(30));
        assert_eq!(
            effective_vip_level(VipLevel::Svip, future, now),
            VipLevel::Svip
        );
    }

    #[test]
    fn test_null_expiry_keeps_stored_level() {
        // 空过期时间意味着"未跟踪过期约束", 不是"已过期"
        let now = Utc::now();
        assert_eq!(effective_vip_level(VipLevel::Vip, None, now), VipLevel::Vip);
    }

    #[test]
    fn test_expiry_exactly_now_is_not_expired() {
        // 严格早于 now 才降级
        let now = Utc::now();
        assert_eq!(
            effective_vip_level(VipLevel::Vip, Some(now), now),
            VipLevel::Vip
        );
    }

    #[test]
    fn test_start_of_local_day_is_midnight() {
        let start = start_of_local_day().with_timezone(&Local);
        assert_eq!(start.format("%H:%M:%S").to_string(), "00:00:00");
    }

    #[test]
    fn test_quota_allows_below_limit() {
        assert!(check_quota(1, 2).is_ok());
        assert!(check_quota(0, 2).is_ok());
    }

    #[test]
    fn test_quota_refuses_at_limit_with_both_numbers() {
        let err = check_quota(2, 2).unwrap_err();
        assert!(err.to_string().contains("2/2"));

        let err = check_quota(25, 20).unwrap_err();
        assert!(err.to_string().contains("25/20"));
    }
}
