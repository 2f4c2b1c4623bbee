//! 作用域与名称工具函数的单元测试

#[cfg(test)]
mod tests {
    use crate::utils::{
        canonical_dm_pair, datetime_to_millis, dm_scope_label, email_local_part, is_valid_email,
        millis_to_datetime, presence_scope_label, slugify_channel_name, typing_scope_label,
    };
    use uuid::Uuid;

    #[test]
    fn test_millis_roundtrip() {
        let dt = millis_to_datetime(1_767_225_600_000).expect("valid millis");
        assert_eq!(datetime_to_millis(&dt), 1_767_225_600_000);

        // 测试：超出范围的毫秒值
        assert!(millis_to_datetime(i64::MAX).is_none());
    }

    #[test]
    fn test_slugify_channel_name() {
        assert_eq!(slugify_channel_name("Design Team"), "design-team");
        assert_eq!(slugify_channel_name("  general  "), "general");
        assert_eq!(slugify_channel_name("a  b\tc"), "a-b-c");
        assert_eq!(slugify_channel_name("already-slugged"), "already-slugged");
    }

    #[test]
    fn test_canonical_dm_pair_is_order_independent() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(canonical_dm_pair(a, b), canonical_dm_pair(b, a));
        assert_eq!(dm_scope_label(a, b), dm_scope_label(b, a));

        // 测试：相同用户
        assert_eq!(canonical_dm_pair(a, a), (a, a));
    }

    #[test]
    fn test_scope_labels() {
        let ws = Uuid::new_v4();
        assert_eq!(presence_scope_label(ws), format!("presence:{}", ws));
        assert_eq!(
            typing_scope_label(&format!("channel:{}", ws)),
            format!("typing:channel:{}", ws)
        );
    }

    #[test]
    fn test_email_local_part() {
        assert_eq!(email_local_part("ada@example.com"), Some("ada"));
        assert_eq!(email_local_part("@example.com"), None);
    }

    #[test]
    fn test_is_valid_email() {
        assert!(is_valid_email("ada@example.com"));
        assert!(is_valid_email("a.b+c@mail.example.org"));

        // 测试：无效格式
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("two@@example.com"));
        assert!(!is_valid_email("spaces in@example.com"));
        assert!(!is_valid_email("nodot@example"));
        assert!(!is_valid_email("trailing@example."));
        assert!(!is_valid_email("@example.com"));
    }
}
