//! 通用工具函数

use xxhash_rust::xxh64::xxh64;

/// 生成带前缀的随机 id（如 `re_` 退款、`po_` 批次）
pub fn prefixed_id(prefix: &str) -> String {
    format!("{}{}", prefix, uuid::Uuid::new_v4().simple())
}

/// 新的不透明会话 id
pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// 加盐哈希 IP，落库前调用，原始 IP 永不落库
pub fn hash_ip(salt: &str, ip: &str) -> String {
    let mut input = Vec::with_capacity(salt.len() + ip.len() + 1);
    input.extend_from_slice(salt.as_bytes());
    input.push(b'|');
    input.extend_from_slice(ip.as_bytes());
    format!("{:016x}", xxh64(&input, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_ip_is_salted() {
        let a = hash_ip("salt-a", "203.0.113.7");
        let b = hash_ip("salt-b", "203.0.113.7");
        assert_ne!(a, b);
        assert_eq!(a, hash_ip("salt-a", "203.0.113.7"));
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn test_prefixed_id_prefix() {
        let id = prefixed_id("po_");
        assert!(id.starts_with("po_"));
        assert!(id.len() > 10);
    }
}
