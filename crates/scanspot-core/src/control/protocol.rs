//! 控制协议编解码与分发
//!
//! 请求: `{"command": <string>, ...}`
//! 响应: `{"command", "success", "errors", "status"?}`

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// 已定义的命令名
pub mod commands {
    pub const CHECK_CONNECTION: &str = "check_connection";
    pub const GET_STATUS: &str = "get_status";
}

/// 控制通道响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub command: String,
    /// 状态载荷，只在 get_status 响应里出现 (扩展点)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub status: Option<BTreeMap<String, rmpv::Value>>,
    pub success: bool,
    pub errors: Vec<String>,
}

impl Response {
    /// 成功响应
    pub fn ok(command: &str) -> Self {
        Self {
            command: command.to_string(),
            status: None,
            success: true,
            errors: Vec::new(),
        }
    }

    /// 带状态载荷的成功响应
    pub fn with_status(command: &str, status: BTreeMap<String, rmpv::Value>) -> Self {
        Self {
            status: Some(status),
            ..Self::ok(command)
        }
    }

    /// 失败响应
    pub fn error(command: &str, error: &str) -> Self {
        Self {
            command: command.to_string(),
            status: None,
            success: false,
            errors: vec![error.to_string()],
        }
    }
}

/// 解出请求帧里的命令名
///
/// 载荷必须是 msgpack 映射；缺少 `command` 键或值不是字符串时
/// 返回 None，由调用方关闭该连接 (连接级协议错误，不回应答)。
pub fn unpack_command(payload: &[u8]) -> anyhow::Result<Option<String>> {
    let value: rmpv::Value = rmp_serde::from_slice(payload)?;
    let rmpv::Value::Map(entries) = value else {
        anyhow::bail!("control frame is not a map");
    };
    for (key, val) in &entries {
        if key.as_str() == Some("command") {
            return Ok(val.as_str().map(str::to_string));
        }
    }
    Ok(None)
}

/// 按命令名分发
pub fn dispatch(command: &str) -> Response {
    match command {
        commands::CHECK_CONNECTION => Response::ok(commands::CHECK_CONNECTION),
        commands::GET_STATUS => Response::with_status(commands::GET_STATUS, BTreeMap::new()),
        unknown => Response::error(unknown, "unknown_command"),
    }
}

/// 打包响应为 msgpack 字符串键映射
pub fn pack_response(response: &Response) -> anyhow::Result<Vec<u8>> {
    Ok(rmp_serde::to_vec_named(response)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack_request(entries: Vec<(&str, rmpv::Value)>) -> Vec<u8> {
        let map = rmpv::Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (rmpv::Value::from(k), v))
                .collect(),
        );
        let mut buf = Vec::new();
        rmpv::encode::write_value(&mut buf, &map).unwrap();
        buf
    }

    fn unpack_map(payload: &[u8]) -> Vec<(String, rmpv::Value)> {
        let value: rmpv::Value = rmp_serde::from_slice(payload).unwrap();
        let rmpv::Value::Map(entries) = value else {
            panic!("response is not a map");
        };
        entries
            .into_iter()
            .map(|(k, v)| (k.as_str().unwrap().to_string(), v))
            .collect()
    }

    fn field<'a>(entries: &'a [(String, rmpv::Value)], key: &str) -> &'a rmpv::Value {
        &entries.iter().find(|(k, _)| k == key).unwrap().1
    }

    #[test]
    fn test_unpack_command() {
        let payload = pack_request(vec![("command", rmpv::Value::from("check_connection"))]);
        assert_eq!(
            unpack_command(&payload).unwrap(),
            Some("check_connection".to_string())
        );
    }

    #[test]
    fn test_unpack_missing_command() {
        let payload = pack_request(vec![("other", rmpv::Value::from(1))]);
        assert_eq!(unpack_command(&payload).unwrap(), None);
    }

    #[test]
    fn test_unpack_non_string_command() {
        let payload = pack_request(vec![("command", rmpv::Value::from(42))]);
        assert_eq!(unpack_command(&payload).unwrap(), None);
    }

    #[test]
    fn test_unpack_not_a_map() {
        let mut buf = Vec::new();
        rmpv::encode::write_value(&mut buf, &rmpv::Value::from("command")).unwrap();
        assert!(unpack_command(&buf).is_err());
    }

    #[test]
    fn test_unpack_garbage() {
        assert!(unpack_command(&[0xc1]).is_err());
    }

    /// check_connection 的应答形状必须逐字段精确
    #[test]
    fn test_check_connection_shape() {
        let packed = pack_response(&dispatch("check_connection")).unwrap();
        let entries = unpack_map(&packed);

        assert_eq!(entries.len(), 3);
        assert_eq!(field(&entries, "command").as_str(), Some("check_connection"));
        assert_eq!(field(&entries, "success").as_bool(), Some(true));
        assert_eq!(field(&entries, "errors"), &rmpv::Value::Array(vec![]));
    }

    /// get_status 带一个空映射作为扩展点
    #[test]
    fn test_get_status_shape() {
        let packed = pack_response(&dispatch("get_status")).unwrap();
        let entries = unpack_map(&packed);

        assert_eq!(entries.len(), 4);
        assert_eq!(field(&entries, "command").as_str(), Some("get_status"));
        assert_eq!(field(&entries, "status"), &rmpv::Value::Map(vec![]));
        assert_eq!(field(&entries, "success").as_bool(), Some(true));
        assert_eq!(field(&entries, "errors"), &rmpv::Value::Array(vec![]));
    }

    /// 未知命令要返回显式错误，而不是退化的空映射
    #[test]
    fn test_unknown_command_shape() {
        let packed = pack_response(&dispatch("reboot")).unwrap();
        let entries = unpack_map(&packed);

        assert_eq!(field(&entries, "command").as_str(), Some("reboot"));
        assert_eq!(field(&entries, "success").as_bool(), Some(false));
        assert_eq!(
            field(&entries, "errors"),
            &rmpv::Value::Array(vec![rmpv::Value::from("unknown_command")])
        );
    }

    /// 每种已定义应答形状的序列化保真往返
    #[test]
    fn test_response_roundtrip() {
        for response in [
            dispatch(commands::CHECK_CONNECTION),
            dispatch(commands::GET_STATUS),
            dispatch("bogus"),
        ] {
            let packed = pack_response(&response).unwrap();
            let decoded: Response = rmp_serde::from_slice(&packed).unwrap();
            assert_eq!(decoded, response);
        }
    }
}
