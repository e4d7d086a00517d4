// portal_client/src/roles/student.rs

//! 学生门户：登录、查看模块目录、查看已注册模块、注册模块。

use crate::cache::{ModuleRow, Session};
use crate::error::ClientError;
use crate::ws_client::PortalClientHandle;
use common_models::ws_payloads::{RegistrationPayload, StudentKey, StudentLoginPayload};
use common_models::{ActionName, Module, ModuleCode, Payload, StatusSeverity};
use log::info;
use std::collections::BTreeSet;

pub struct StudentPortal {
    client: PortalClientHandle,
}

impl StudentPortal {
    pub fn new(client: PortalClientHandle) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &PortalClientHandle {
        &self.client
    }

    /// 登录成功后返回新建立的会话。模块目录和注册集合的刷新由客户端自动发起。
    pub async fn login(&self, student_id: &str, password: &str) -> Result<Session, ClientError> {
        let payload = StudentLoginPayload { student_id: student_id.to_string(), password: password.to_string() };
        let response = self.client.dispatch_with(ActionName::StudentLogin, &payload).await?;
        info!("[StudentPortal] {}", response.message);
        self.client.session().await.ok_or(ClientError::NoActiveSession)
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        self.client.logout().await
    }

    /// 获取模块目录 (`VIEW_MODULES`)。
    pub async fn load_modules(&self) -> Result<Vec<Module>, ClientError> {
        let response = self.client.dispatch(ActionName::ViewModules, Payload::new()).await?;
        let modules: Option<Vec<Module>> =
            response.data_as().map_err(|e| ClientError::MalformedResponse(e.to_string()))?;
        Ok(modules.unwrap_or_default())
    }

    /// 刷新当前会话的注册集合并返回它。
    pub async fn load_registered_modules(&self) -> Result<BTreeSet<ModuleCode>, ClientError> {
        let student_id = self.require_student_id().await?;
        self.client.dispatch_with(ActionName::ViewRegisteredModules, &StudentKey { student_id }).await?;
        Ok(self.client.session().await.map(|s| s.registered_modules).unwrap_or_default())
    }

    /// 为当前学生注册一个模块，返回后端的确认消息。
    ///
    /// 注册集合不会被立即修改，客户端随后会重新获取注册集合和模块目录。
    pub async fn register_module(&self, module_code: &str) -> Result<String, ClientError> {
        let student_id = self.require_student_id().await?;
        let payload = RegistrationPayload { student_id, module_code: module_code.to_string() };
        let response = self.client.dispatch_with(ActionName::RegisterModule, &payload).await?;
        Ok(response.message)
    }

    pub async fn module_rows(&self) -> Vec<ModuleRow> {
        self.client.cache_snapshot().await.module_rows()
    }

    pub async fn is_registered(&self, module_code: &str) -> bool {
        self.client.session().await.is_some_and(|s| s.registered_modules.contains(module_code))
    }

    async fn require_student_id(&self) -> Result<String, ClientError> {
        let student_id = self.client.session().await.filter(Session::is_student).and_then(|s| s.student_id);
        match student_id {
            Some(id) => Ok(id),
            None => {
                self.client.notify(ClientError::NoActiveSession.to_string(), StatusSeverity::Error).await;
                Err(ClientError::NoActiveSession)
            }
        }
    }
}
