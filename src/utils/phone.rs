use crate::error::{AppError, AppResult};
use regex::Regex;

/// 验证中国大陆手机号格式
pub fn validate_cn_phone(phone: &str) -> AppResult<()> {
    let phone_regex = Regex::new(r"^1[3-9]\d{9}$").unwrap();

    if !phone_regex.is_match(phone) {
        return Err(AppError::ValidationError(
            "手机号格式无效，必须是大陆手机号格式 (1xxxxxxxxxx)".to_string(),
        ));
    }

    Ok(())
}

/// 手机号后四位, 用于默认昵称与日志脱敏
pub fn phone_last4(phone: &str) -> &str {
    if phone.len() >= 4 {
        &phone[phone.len() - 4..]
    } else {
        phone
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_cn_phone() {
        assert!(validate_cn_phone("13800000000").is_ok());
        assert!(validate_cn_phone("19912345678").is_ok());
        assert!(validate_cn_phone("12345678901").is_err());
        assert!(validate_cn_phone("1380000000").is_err());
        assert!(validate_cn_phone("+8613800000000").is_err());
        assert!(validate_cn_phone("23800000000").is_err());
    }

    #[test]
    fn test_phone_last4() {
        assert_eq!(phone_last4("13800000000"), "0000");
        assert_eq!(phone_last4("13912345678"), "5678");
        assert_eq!(phone_last4("123"), "123");
    }
}
