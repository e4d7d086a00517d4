// portal_client/src/ws_client/router.rs

//! 响应路由器。
//!
//! 把已解码的响应信封交给它所对应请求的动作处理逻辑，并据此修改本地状态缓存。
//! 响应的 `data` 没有按动作打标签，形状完全由请求的动作决定。
//! 所有解码都在修改缓存之前完成：形状不符时缓存保持不变。

use crate::cache::{CacheSection, EntityDetail, LocalStateCache, RegisteredEntry, Session};
use crate::error::ClientError;
use common_models::{ActionName, Module, Payload, ResponseEnvelope, StatusSeverity, Student};
use log::{debug, info, warn};
use rust_websocket_utils::message::decode_frame;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// 解析失败时展示给用户的通用状态文本。
pub const PARSE_ERROR_STATUS: &str = "解析服务器响应失败";

/// 将一个文本帧解码为响应信封。
pub fn decode_response(text: &str) -> Result<ResponseEnvelope, ClientError> {
    decode_frame::<ResponseEnvelope>(text).map_err(|e| ClientError::MalformedResponse(e.to_string()))
}

/// 路由一条响应的结果。
#[derive(Debug)]
pub struct RouteOutcome {
    /// 交给等待者的结果。
    pub result: Result<ResponseEnvelope, ClientError>,
    /// 需要由客户端自动发起的后续请求。
    pub follow_ups: Vec<(ActionName, Payload)>,
    /// 要显示的状态消息。
    pub status: (String, StatusSeverity),
    /// 本次被修改的缓存部分。
    pub updated: Vec<CacheSection>,
}

impl RouteOutcome {
    fn failure(error: ClientError, status: (String, StatusSeverity)) -> Self {
        Self { result: Err(error), follow_ups: Vec::new(), status, updated: Vec::new() }
    }
}

#[derive(Debug, Default)]
pub struct ResponseRouter;

impl ResponseRouter {
    /// `action` 和 `request_data` 来自与该响应匹配的待处理请求。
    pub fn route(
        action: ActionName,
        request_data: &Payload,
        response: ResponseEnvelope,
        cache: &mut LocalStateCache,
    ) -> RouteOutcome {
        if !response.success {
            info!("[ResponseRouter] {} 失败: {}", action, response.message);
            let message = response.message.clone();
            return RouteOutcome::failure(ClientError::ApplicationFailure(message.clone()), (message, StatusSeverity::Error));
        }

        match Self::apply_success(action, request_data, &response, cache) {
            Ok((updated, follow_ups)) => {
                debug!("[ResponseRouter] {} 成功，更新: {:?}，后续请求: {}", action, updated, follow_ups.len());
                RouteOutcome {
                    status: (response.message.clone(), StatusSeverity::Success),
                    result: Ok(response),
                    follow_ups,
                    updated,
                }
            }
            Err(error) => {
                warn!("[ResponseRouter] {} 的响应数据形状不符: {}", action, error);
                RouteOutcome::failure(error, (PARSE_ERROR_STATUS.to_string(), StatusSeverity::Error))
            }
        }
    }

    fn apply_success(
        action: ActionName,
        request_data: &Payload,
        response: &ResponseEnvelope,
        cache: &mut LocalStateCache,
    ) -> Result<(Vec<CacheSection>, Vec<(ActionName, Payload)>), ClientError> {
        let mut updated = Vec::new();
        let mut follow_ups = Vec::new();

        match action {
            ActionName::ListStudents => {
                let students: Vec<Student> = decode_list(response)?;
                cache.replace_students(students);
                updated.push(CacheSection::Students);
            }
            ActionName::ListModules | ActionName::ViewModules => {
                let modules: Vec<Module> = decode_list(response)?;
                cache.replace_modules(modules);
                updated.push(CacheSection::Modules);
            }
            ActionName::ViewStudent => {
                let student: Student = decode_data(response)?;
                cache.set_detail(EntityDetail::Student(student));
                updated.push(CacheSection::Detail);
            }
            ActionName::ViewModule => {
                let module: Module = decode_data(response)?;
                cache.set_detail(EntityDetail::Module(module));
                updated.push(CacheSection::Detail);
            }
            ActionName::StudentLogin => {
                let student: Student = decode_data(response)?;
                let session = Session::student(&student);
                cache.establish_session(session);
                updated.push(CacheSection::Session);
                follow_ups.push((ActionName::ViewModules, Payload::new()));
                follow_ups.push((ActionName::ViewRegisteredModules, student_key(&student.student_id)));
            }
            ActionName::ViewRegisteredModules => {
                let entries: Vec<RegisteredEntry> = decode_list(response)?;
                let requested = request_data.get("studentId").and_then(Value::as_str);
                if requested.is_some() && cache.student_id() == requested {
                    cache.replace_registrations(entries);
                    updated.push(CacheSection::Registrations);
                } else {
                    debug!("[ResponseRouter] 注册集合响应不属于当前会话 (请求: {:?})，已丢弃。", requested);
                }
            }
            ActionName::RegisterModule => {
                // 不直接把模块加入注册集合，而是重新获取权威数据。
                let student_id = request_data
                    .get("studentId")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .or_else(|| cache.student_id().map(str::to_string));
                if let Some(student_id) = student_id {
                    follow_ups.push((ActionName::ViewRegisteredModules, student_key(&student_id)));
                }
                follow_ups.push((ActionName::ViewModules, Payload::new()));
            }
            ActionName::AddStudent | ActionName::EditStudent => {
                follow_ups.push((ActionName::ListStudents, Payload::new()));
            }
            ActionName::AddModule | ActionName::EditModule => {
                follow_ups.push((ActionName::ListModules, Payload::new()));
            }
        }

        Ok((updated, follow_ups))
    }
}

fn student_key(student_id: &str) -> Payload {
    let mut payload = Payload::new();
    payload.insert("studentId".to_string(), Value::String(student_id.to_string()));
    payload
}

fn decode_data<T: DeserializeOwned>(response: &ResponseEnvelope) -> Result<T, ClientError> {
    response.data_as::<T>().map_err(|e| ClientError::MalformedResponse(e.to_string()))
}

// 列表缺失或为 null 时视为空列表。
fn decode_list<T: DeserializeOwned>(response: &ResponseEnvelope) -> Result<Vec<T>, ClientError> {
    decode_data::<Option<Vec<T>>>(response).map(Option::unwrap_or_default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ok(message: &str, data: Value) -> ResponseEnvelope {
        ResponseEnvelope::ok(message, Some(data))
    }

    fn login(cache: &mut LocalStateCache) -> RouteOutcome {
        let response = ok("Login successful", json!({"studentId": "S1", "name": "Ann", "registeredModules": ["CS101"]}));
        ResponseRouter::route(ActionName::StudentLogin, &Payload::new(), response, cache)
    }

    #[test]
    /// 登录成功后建立会话，并发起模块目录和注册集合的刷新。
    fn test_login_establishes_session_and_requests_refresh() {
        let mut cache = LocalStateCache::new();
        let outcome = login(&mut cache);
        assert!(outcome.result.is_ok());
        assert_eq!(outcome.status, ("Login successful".to_string(), StatusSeverity::Success));
        assert_eq!(outcome.updated, vec![CacheSection::Session]);
        assert_eq!(cache.student_id(), Some("S1"));
        assert_eq!(cache.session().unwrap().name.as_deref(), Some("Ann"));
        assert!(cache.is_module_registered("CS101"));

        let actions: Vec<ActionName> = outcome.follow_ups.iter().map(|(a, _)| *a).collect();
        assert_eq!(actions, vec![ActionName::ViewModules, ActionName::ViewRegisteredModules]);
        assert_eq!(outcome.follow_ups[1].1.get("studentId"), Some(&json!("S1")));
    }

    #[test]
    fn test_registration_query_updates_membership() {
        let mut cache = LocalStateCache::new();
        login(&mut cache);
        assert!(!cache.is_module_registered("CS102"));

        let outcome = ResponseRouter::route(
            ActionName::ViewRegisteredModules,
            &student_key("S1"),
            ok("Registered modules retrieved", json!(["CS101", "CS102"])),
            &mut cache,
        );
        assert_eq!(outcome.updated, vec![CacheSection::Registrations]);
        assert!(cache.is_module_registered("CS102"));
    }

    #[test]
    /// REGISTER_MODULE 成功本身不会把模块加入缓存，只有随后的注册集合查询才会。
    fn test_register_module_does_not_optimistically_add() {
        let mut cache = LocalStateCache::new();
        login(&mut cache);
        let mut request = student_key("S1");
        request.insert("moduleCode".to_string(), json!("CS201"));

        let outcome = ResponseRouter::route(
            ActionName::RegisterModule,
            &request,
            ResponseEnvelope::ok("Module registered successfully", None),
            &mut cache,
        );
        assert!(outcome.result.is_ok());
        assert!(outcome.updated.is_empty());
        assert!(!cache.is_module_registered("CS201"));
        let actions: Vec<ActionName> = outcome.follow_ups.iter().map(|(a, _)| *a).collect();
        assert_eq!(actions, vec![ActionName::ViewRegisteredModules, ActionName::ViewModules]);

        let module = json!({"moduleCode": "CS201", "moduleName": "Data Structures", "description": "", "credits": 4});
        ResponseRouter::route(
            ActionName::ViewRegisteredModules,
            &outcome.follow_ups[0].1,
            ok("Registered modules retrieved", json!([module])),
            &mut cache,
        );
        assert!(cache.is_module_registered("CS201"));
    }

    #[test]
    fn test_failure_response_does_not_touch_cache() {
        let mut cache = LocalStateCache::new();
        let before = cache.clone();
        let outcome =
            ResponseRouter::route(ActionName::StudentLogin, &Payload::new(), ResponseEnvelope::failure("Invalid credentials"), &mut cache);
        assert_eq!(outcome.result.unwrap_err(), ClientError::ApplicationFailure("Invalid credentials".to_string()));
        assert_eq!(outcome.status, ("Invalid credentials".to_string(), StatusSeverity::Error));
        assert!(outcome.follow_ups.is_empty());
        assert_eq!(cache, before);
    }

    #[test]
    /// 数据形状与动作不符时返回 MalformedResponse，缓存不变。
    fn test_shape_mismatch_is_malformed() {
        let mut cache = LocalStateCache::new();
        login(&mut cache);
        let before = cache.clone();
        let outcome = ResponseRouter::route(
            ActionName::ViewModules,
            &Payload::new(),
            ok("Modules retrieved", json!({"not": "a list"})),
            &mut cache,
        );
        assert!(matches!(outcome.result, Err(ClientError::MalformedResponse(_))));
        assert_eq!(outcome.status.0, PARSE_ERROR_STATUS);
        assert!(outcome.follow_ups.is_empty());
        assert_eq!(cache, before);
    }

    #[test]
    fn test_registration_response_for_other_student_is_discarded() {
        let mut cache = LocalStateCache::new();
        login(&mut cache);
        let outcome = ResponseRouter::route(
            ActionName::ViewRegisteredModules,
            &student_key("S999"),
            ok("Registered modules retrieved", json!(["CS301"])),
            &mut cache,
        );
        assert!(outcome.result.is_ok());
        assert!(outcome.updated.is_empty());
        assert!(!cache.is_module_registered("CS301"));
    }

    #[test]
    fn test_catalog_and_detail_handling() {
        let mut cache = LocalStateCache::new();
        let outcome = ResponseRouter::route(
            ActionName::ListStudents,
            &Payload::new(),
            ok("Students retrieved", json!([{"studentId": "S001", "name": "John Doe", "email": "john@example.com", "registeredModules": []}])),
            &mut cache,
        );
        assert_eq!(outcome.updated, vec![CacheSection::Students]);
        assert_eq!(cache.students().len(), 1);

        ResponseRouter::route(ActionName::ListModules, &Payload::new(), ResponseEnvelope::ok("Modules retrieved", None), &mut cache);
        assert!(cache.modules().is_empty());

        ResponseRouter::route(
            ActionName::ViewModule,
            &Payload::new(),
            ok("Module retrieved", json!({"moduleCode": "CS301", "moduleName": "Database Systems", "description": "", "credits": 3})),
            &mut cache,
        );
        assert!(matches!(cache.detail(), Some(EntityDetail::Module(m)) if m.module_code == "CS301"));
    }

    #[test]
    fn test_admin_writes_trigger_list_refetch() {
        let mut cache = LocalStateCache::new();
        for (action, expected) in [
            (ActionName::AddStudent, ActionName::ListStudents),
            (ActionName::EditStudent, ActionName::ListStudents),
            (ActionName::AddModule, ActionName::ListModules),
            (ActionName::EditModule, ActionName::ListModules),
        ] {
            let outcome = ResponseRouter::route(action, &Payload::new(), ResponseEnvelope::ok("done", None), &mut cache);
            assert_eq!(outcome.follow_ups.len(), 1);
            assert_eq!(outcome.follow_ups[0].0, expected);
        }
    }

    #[test]
    fn test_decode_response_rejects_bad_frames() {
        assert!(matches!(decode_response("{oops"), Err(ClientError::MalformedResponse(_))));
        assert!(matches!(decode_response(r#"{"message":"missing success"}"#), Err(ClientError::MalformedResponse(_))));
        assert!(decode_response(r#"{"success":true,"message":"ok"}"#).is_ok());
    }
}
