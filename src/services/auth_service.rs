use crate::entities::{user_entity as users, VipLevel};
use crate::error::{AppError, AppResult};
use crate::external::WechatApi;
use crate::models::*;
use crate::services::SmsService;
use crate::utils::{phone_last4, validate_cn_phone, JwtService};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, ModelTrait, QueryFilter, QuerySelect, Set, TransactionTrait,
};

/// 账号合并后幸存记录应持有的价值字段。
/// 等级按序数取高; 同级取较晚过期时间; 积分相加; 资料仅补缺。
#[derive(Debug, PartialEq)]
pub(crate) struct MergedValues {
    pub vip_level: VipLevel,
    pub vip_expire_at: Option<DateTime<Utc>>,
    pub points_balance: i32,
    pub nick_name: Option<String>,
    pub avatar_url: Option<String>,
}

pub(crate) fn merge_account_values(winner: &users::Model, loser: &users::Model) -> MergedValues {
    let (vip_level, vip_expire_at) = if loser.vip_level.rank() > winner.vip_level.rank() {
        (loser.vip_level, loser.vip_expire_at)
    } else if loser.vip_level == winner.vip_level {
        // 同等级取较晚的过期时间
        match (winner.vip_expire_at, loser.vip_expire_at) {
            (Some(w), Some(l)) if l > w => (winner.vip_level, Some(l)),
            _ => (winner.vip_level, winner.vip_expire_at),
        }
    } else {
        (winner.vip_level, winner.vip_expire_at)
    };

    MergedValues {
        vip_level,
        vip_expire_at,
        points_balance: winner.points_balance + loser.points_balance,
        nick_name: winner.nick_name.clone().or_else(|| loser.nick_name.clone()),
        avatar_url: winner
            .avatar_url
            .clone()
            .or_else(|| loser.avatar_url.clone()),
    }
}

fn conflict_info(owner: &users::Model, conflict_type: &str, message: &str) -> AccountConflictInfo {
    AccountConflictInfo {
        conflict_type: conflict_type.to_string(),
        existing_account: ConflictAccount {
            id: owner.id,
            nick_name: owner.nick_name.clone(),
            avatar_url: owner.avatar_url.clone(),
            vip_level: owner.vip_level,
            created_at: owner.created_at,
        },
        message: message.to_string(),
    }
}

#[derive(Clone)]
pub struct AuthService {
    pool: DatabaseConnection,
    jwt_service: JwtService,
    sms_service: SmsService,
    wechat_api: WechatApi,
}

impl AuthService {
    pub fn new(
        pool: DatabaseConnection,
        jwt_service: JwtService,
        sms_service: SmsService,
        wechat_api: WechatApi,
    ) -> Self {
        Self {
            pool,
            jwt_service,
            sms_service,
            wechat_api,
        }
    }

    /// 微信登录: code 换 session, 解析手机号 (非致命), 按 openid 找到或创建用户
    pub async fn wechat_login(&self, request: WechatLoginRequest) -> AppResult<AuthResponse> {
        let session = self.wechat_api.code2session(&request.code).await?;

        // 手机号解析: 优先 phone_code, 否则旧版加密数据兜底; 两者都失败不阻断登录
        let phone = if let Some(phone_code) = &request.phone_code {
            match self.wechat_api.get_phone_by_code(phone_code).await {
                Ok(phone) => phone,
                Err(e) => {
                    log::warn!("Phone resolution via phone_code failed: {e}");
                    None
                }
            }
        } else if let (Some(encrypted_data), Some(iv)) = (&request.encrypted_data, &request.iv) {
            WechatApi::decrypt_phone(encrypted_data, iv, &session.session_key)
        } else {
            None
        };

        let user_info = request.user_info;
        let existing = users::Entity::find()
            .filter(users::Column::Openid.eq(session.openid.clone()))
            .one(&self.pool)
            .await?;

        let user = match existing {
            None => {
                // 解析出的手机号可能已属于他人; 登录绝不触碰别人的行, 归属裁决留给绑定流程
                let phone = match phone {
                    Some(p) => {
                        if self.phone_available(&self.pool, &p, None).await? {
                            Some(p)
                        } else {
                            log::info!(
                                "Phone ending {} already owned by another account, login proceeds without it",
                                phone_last4(&p)
                            );
                            None
                        }
                    }
                    None => None,
                };

                let model = users::ActiveModel {
                    openid: Set(Some(session.openid.clone())),
                    unionid: Set(session.unionid.clone()),
                    phone: Set(phone),
                    nick_name: Set(user_info.as_ref().and_then(|u| u.nick_name.clone())),
                    avatar_url: Set(user_info.as_ref().and_then(|u| u.avatar_url.clone())),
                    vip_level: Set(VipLevel::Normal),
                    points_balance: Set(0),
                    created_at: Set(Some(Utc::now())),
                    updated_at: Set(Some(Utc::now())),
                    ..Default::default()
                }
                .insert(&self.pool)
                .await?;
                log::info!("Created new user {} with openid", model.id);
                model
            }
            Some(user) => {
                // 仅在值变化时刷新, 避免冗余写
                let mut changed = false;
                let mut am = user.clone().into_active_model();

                if let Some(info) = &user_info {
                    if let Some(nick) = &info.nick_name {
                        if user.nick_name.as_ref() != Some(nick) {
                            am.nick_name = Set(Some(nick.clone()));
                            changed = true;
                        }
                    }
                    if let Some(avatar) = &info.avatar_url {
                        if user.avatar_url.as_ref() != Some(avatar) {
                            am.avatar_url = Set(Some(avatar.clone()));
                            changed = true;
                        }
                    }
                }
                if let Some(p) = &phone {
                    if user.phone.as_deref() != Some(p.as_str())
                        && self.phone_available(&self.pool, p, Some(user.id)).await?
                    {
                        am.phone = Set(Some(p.clone()));
                        changed = true;
                    }
                }
                if let Some(unionid) = &session.unionid {
                    if user.unionid.as_ref() != Some(unionid) {
                        am.unionid = Set(Some(unionid.clone()));
                        changed = true;
                    }
                }

                if changed {
                    am.updated_at = Set(Some(Utc::now()));
                    let updated = am.update(&self.pool).await?;
                    log::info!("Updated user {} info on login", updated.id);
                    updated
                } else {
                    user
                }
            }
        };

        self.issue_token(user)
    }

    /// 手机号登录/注册: 需验证码; 新用户昵称默认取手机号后四位
    pub async fn phone_login(&self, request: PhoneLoginRequest) -> AppResult<AuthResponse> {
        validate_cn_phone(&request.phone)?;

        let valid = self
            .sms_service
            .verify_code(&request.phone, &request.code)
            .await?;
        if !valid {
            return Err(AppError::InvalidCredential(
                "Invalid or expired verification code".to_string(),
            ));
        }

        let existing = users::Entity::find()
            .filter(users::Column::Phone.eq(request.phone.clone()))
            .one(&self.pool)
            .await?;

        let user = match existing {
            None => {
                let nick_name = request
                    .nick_name
                    .clone()
                    .unwrap_or_else(|| format!("用户{}", phone_last4(&request.phone)));
                let model = users::ActiveModel {
                    phone: Set(Some(request.phone.clone())),
                    nick_name: Set(Some(nick_name)),
                    avatar_url: Set(request.avatar_url.clone()),
                    vip_level: Set(VipLevel::Normal),
                    points_balance: Set(0),
                    created_at: Set(Some(Utc::now())),
                    updated_at: Set(Some(Utc::now())),
                    ..Default::default()
                }
                .insert(&self.pool)
                .await?;
                log::info!(
                    "New user {} registered with phone ending {}",
                    model.id,
                    phone_last4(&request.phone)
                );
                model
            }
            Some(user) => {
                let mut changed = false;
                let mut am = user.clone().into_active_model();
                if let Some(nick) = &request.nick_name {
                    if user.nick_name.as_ref() != Some(nick) {
                        am.nick_name = Set(Some(nick.clone()));
                        changed = true;
                    }
                }
                if let Some(avatar) = &request.avatar_url {
                    if user.avatar_url.as_ref() != Some(avatar) {
                        am.avatar_url = Set(Some(avatar.clone()));
                        changed = true;
                    }
                }
                if changed {
                    am.updated_at = Set(Some(Utc::now()));
                    am.update(&self.pool).await?
                } else {
                    user
                }
            }
        };

        self.issue_token(user)
    }

    /// 检查手机号是否已被其他账号占用 (归属同一 openid 则视为无冲突)
    pub async fn check_phone_conflict(
        &self,
        phone: &str,
        current_openid: Option<&str>,
    ) -> AppResult<Option<AccountConflictInfo>> {
        let owner = users::Entity::find()
            .filter(users::Column::Phone.eq(phone))
            .one(&self.pool)
            .await?;

        let owner = match owner {
            Some(owner) => owner,
            None => return Ok(None),
        };

        // 手机号属于同一 openid 的用户时没有冲突
        if owner.openid.as_deref() == current_openid {
            return Ok(None);
        }

        Ok(Some(conflict_info(
            &owner,
            "phone_exists",
            "This phone number is already associated with another account",
        )))
    }

    /// 绑定手机号到当前账号。
    ///
    /// 手机号已属他人且未同意合并 → Conflict (携带对方公开资料);
    /// 同意合并 → 单事务内: 价值转移 → 删除败方 → 更新幸存方身份字段。
    pub async fn bind_phone(&self, user_id: i64, request: BindPhoneRequest) -> AppResult<UserResponse> {
        validate_cn_phone(&request.phone)?;

        let valid = self
            .sms_service
            .verify_code(&request.phone, &request.code)
            .await?;
        if !valid {
            return Err(AppError::InvalidCredential(
                "Invalid or expired verification code".to_string(),
            ));
        }

        let txn = self.pool.begin().await?;

        let acting = users::Entity::find_by_id(user_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let owner = users::Entity::find()
            .filter(users::Column::Phone.eq(request.phone.clone()))
            .filter(users::Column::Id.ne(user_id))
            .lock_exclusive()
            .one(&txn)
            .await?;

        let user = match owner {
            Some(loser) => {
                if !request.merge {
                    return Err(AppError::Conflict(Box::new(conflict_info(
                        &loser,
                        "phone_exists",
                        "This phone number is already associated with another account",
                    ))));
                }

                // 1. 价值转移到幸存方 (不含身份字段)
                let merged = merge_account_values(&acting, &loser);
                let mut am = acting.clone().into_active_model();
                am.vip_level = Set(merged.vip_level);
                am.vip_expire_at = Set(merged.vip_expire_at);
                am.points_balance = Set(merged.points_balance);
                am.nick_name = Set(merged.nick_name);
                am.avatar_url = Set(merged.avatar_url);
                am.updated_at = Set(Some(Utc::now()));
                let survivor = am.update(&txn).await?;

                // 2. 转移落库后才删除败方
                let loser_id = loser.id;
                loser.delete(&txn).await?;

                // 3. 最后把新绑定的凭据写到幸存方 (此时唯一约束已让位)
                let mut am = survivor.into_active_model();
                am.phone = Set(Some(request.phone.clone()));
                am.updated_at = Set(Some(Utc::now()));
                let survivor = am.update(&txn).await?;

                log::info!("Merged user {} into user {}", loser_id, survivor.id);
                survivor
            }
            None => {
                let mut am = acting.into_active_model();
                am.phone = Set(Some(request.phone.clone()));
                am.updated_at = Set(Some(Utc::now()));
                am.update(&txn).await?
            }
        };

        txn.commit().await?;

        Ok(UserResponse::from(user))
    }

    /// 手机号优先用户绑定微信 — 上游从未实现, 保持失败占位而不是臆造流程
    pub async fn bind_wechat(&self, _user_id: i64) -> AppResult<()> {
        Err(AppError::ValidationError(
            "WeChat binding is not yet supported".to_string(),
        ))
    }

    /// 校验现有令牌并签发新令牌
    pub async fn refresh_token(&self, token: &str) -> AppResult<AuthResponse> {
        let user_id = self.jwt_service.verify_user_id(token)?;

        let user = users::Entity::find_by_id(user_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        self.issue_token(user)
    }

    fn issue_token(&self, user: users::Model) -> AppResult<AuthResponse> {
        let token = self.jwt_service.generate_token(user.id)?;
        Ok(AuthResponse {
            token,
            expires_in: self.jwt_service.get_expires_in(),
            user: UserResponse::from(user),
        })
    }

    /// 手机号未被其他用户占用时返回 true
    async fn phone_available<C: ConnectionTrait>(
        &self,
        conn: &C,
        phone: &str,
        self_id: Option<i64>,
    ) -> AppResult<bool> {
        let mut query = users::Entity::find().filter(users::Column::Phone.eq(phone));
        if let Some(id) = self_id {
            query = query.filter(users::Column::Id.ne(id));
        }
        Ok(query.one(conn).await?.is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user(
        id: i64,
        vip_level: VipLevel,
        vip_expire_at: Option<DateTime<Utc>>,
        points: i32,
        nick_name: Option<&str>,
    ) -> users::Model {
        users::Model {
            id,
            openid: None,
            unionid: None,
            phone: None,
            nick_name: nick_name.map(|s| s.to_string()),
            avatar_url: None,
            vip_level,
            vip_expire_at,
            points_balance: points,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_merge_higher_tier_wins_with_its_expiry() {
        let expiry = Some(Utc::now() + Duration::days(10));
        let winner = user(1, VipLevel::Normal, None, 5, Some("微信用户"));
        let loser = user(2, VipLevel::Vip, expiry, 50, None);

        let merged = merge_account_values(&winner, &loser);
        assert_eq!(merged.vip_level, VipLevel::Vip);
        assert_eq!(merged.vip_expire_at, expiry);
        assert_eq!(merged.points_balance, 55);
        assert_eq!(merged.nick_name.as_deref(), Some("微信用户"));
    }

    #[test]
    fn test_merge_points_sum_is_direction_independent() {
        let a = user(1, VipLevel::Svip, None, 30, None);
        let b = user(2, VipLevel::Normal, None, 12, None);

        assert_eq!(merge_account_values(&a, &b).points_balance, 42);
        assert_eq!(merge_account_values(&b, &a).points_balance, 42);
    }

    #[test]
    fn test_merge_equal_tier_takes_later_expiry() {
        let earlier = Some(Utc::now() + Duration::days(3));
        let later = Some(Utc::now() + Duration::days(30));
        let winner = user(1, VipLevel::Vip, earlier, 0, None);
        let loser = user(2, VipLevel::Vip, later, 0, None);

        let merged = merge_account_values(&winner, &loser);
        assert_eq!(merged.vip_level, VipLevel::Vip);
        assert_eq!(merged.vip_expire_at, later);
    }

    #[test]
    fn test_merge_lower_tier_loser_discards_its_expiry() {
        let winner_expiry = Some(Utc::now() + Duration::days(5));
        let winner = user(1, VipLevel::Svip, winner_expiry, 0, None);
        let loser = user(2, VipLevel::Vip, Some(Utc::now() + Duration::days(300)), 0, None);

        let merged = merge_account_values(&winner, &loser);
        assert_eq!(merged.vip_level, VipLevel::Svip);
        assert_eq!(merged.vip_expire_at, winner_expiry);
    }

    #[test]
    fn test_merge_never_overwrites_present_profile() {
        let mut winner = user(1, VipLevel::Normal, None, 0, Some("已有昵称"));
        winner.avatar_url = Some("https://cdn.example.com/a.png".to_string());
        let mut loser = user(2, VipLevel::Normal, None, 0, Some("对方昵称"));
        loser.avatar_url = Some("https://cdn.example.com/b.png".to_string());

        let merged = merge_account_values(&winner, &loser);
        assert_eq!(merged.nick_name.as_deref(), Some("已有昵称"));
        assert_eq!(
            merged.avatar_url.as_deref(),
            Some("https://cdn.example.com/a.png")
        );
    }
}
