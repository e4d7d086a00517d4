// portal_client/src/roles/admin.rs

//! 管理控制台：学生和模块的增、改、查、列表。
//!
//! 原有后端没有管理员登录动作，打开控制台即在本地建立管理员会话。

use crate::error::ClientError;
use crate::ws_client::PortalClientHandle;
use common_models::ws_payloads::{ModuleForm, ModuleKey, ModuleUpdate, StudentForm, StudentKey, StudentUpdate};
use common_models::{ActionName, Module, Payload, ResponseEnvelope, Student};
use serde::de::DeserializeOwned;

pub struct AdminConsole {
    client: PortalClientHandle,
}

impl AdminConsole {
    /// 建立管理员会话并返回控制台。
    pub async fn open(client: PortalClientHandle) -> Result<Self, ClientError> {
        client.assume_admin().await?;
        Ok(Self { client })
    }

    pub fn client(&self) -> &PortalClientHandle {
        &self.client
    }

    pub async fn add_student(&self, form: &StudentForm) -> Result<String, ClientError> {
        Ok(self.client.dispatch_with(ActionName::AddStudent, form).await?.message)
    }

    /// 只修改 `update` 中出现的字段。
    pub async fn edit_student(&self, update: &StudentUpdate) -> Result<String, ClientError> {
        Ok(self.client.dispatch_with(ActionName::EditStudent, update).await?.message)
    }

    pub async fn view_student(&self, student_id: &str) -> Result<Student, ClientError> {
        self.client.dispatch_typed(ActionName::ViewStudent, &StudentKey { student_id: student_id.to_string() }).await
    }

    pub async fn list_students(&self) -> Result<Vec<Student>, ClientError> {
        let response = self.client.dispatch(ActionName::ListStudents, Payload::new()).await?;
        decode_list(&response)
    }

    pub async fn add_module(&self, form: &ModuleForm) -> Result<String, ClientError> {
        Ok(self.client.dispatch_with(ActionName::AddModule, form).await?.message)
    }

    pub async fn edit_module(&self, update: &ModuleUpdate) -> Result<String, ClientError> {
        Ok(self.client.dispatch_with(ActionName::EditModule, update).await?.message)
    }

    pub async fn view_module(&self, module_code: &str) -> Result<Module, ClientError> {
        self.client.dispatch_typed(ActionName::ViewModule, &ModuleKey { module_code: module_code.to_string() }).await
    }

    pub async fn list_modules(&self) -> Result<Vec<Module>, ClientError> {
        let response = self.client.dispatch(ActionName::ListModules, Payload::new()).await?;
        decode_list(&response)
    }
}

fn decode_list<T: DeserializeOwned>(response: &ResponseEnvelope) -> Result<Vec<T>, ClientError> {
    response
        .data_as::<Option<Vec<T>>>()
        .map(Option::unwrap_or_default)
        .map_err(|e| ClientError::MalformedResponse(e.to_string()))
}
