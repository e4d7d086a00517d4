// portal_client/src/cache.rs

//! 本地状态缓存。
//!
//! 保存当前会话以及最近一次获取的学生、模块目录和注册集合。这些都是后端权威数据的
//! 只读副本，可能已经过期。缓存只由响应路由器 (以及会话生命周期操作) 修改，
//! 表现层只读取快照。

use common_models::{Module, ModuleCode, SessionRole, Student};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 当前已认证参与者的身份。
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub role: SessionRole,
    pub student_id: Option<String>,
    pub name: Option<String>,
    /// 学生会话的注册集合。每次注册集合刷新后按权威数据整体替换。
    pub registered_modules: BTreeSet<ModuleCode>,
}

impl Session {
    pub fn admin() -> Self {
        Self { role: SessionRole::Admin, student_id: None, name: None, registered_modules: BTreeSet::new() }
    }

    /// 由登录响应中的学生记录建立学生会话。
    pub fn student(student: &Student) -> Self {
        Self {
            role: SessionRole::Student,
            student_id: Some(student.student_id.clone()),
            name: Some(student.name.clone()),
            registered_modules: student.registered_modules.clone(),
        }
    }

    pub fn is_student(&self) -> bool {
        self.role == SessionRole::Student
    }
}

/// 最近一次查看的单个实体。
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", content = "entity", rename_all = "camelCase")]
pub enum EntityDetail {
    Student(Student),
    Module(Module),
}

/// 缓存中可被单独刷新的部分。
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum CacheSection {
    Session,
    Students,
    Modules,
    Registrations,
    Detail,
}

/// 模块目录中的一行，附带当前会话是否已注册该模块。
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ModuleRow {
    pub module: Module,
    pub registered: bool,
}

/// `VIEW_REGISTERED_MODULES` 返回列表中的一项。
///
/// 后端可能返回完整的模块对象，也可能只返回模块代码字符串。
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum RegisteredEntry {
    Module(Module),
    Code(ModuleCode),
}

impl RegisteredEntry {
    pub fn code(&self) -> &str {
        match self {
            RegisteredEntry::Module(module) => &module.module_code,
            RegisteredEntry::Code(code) => code,
        }
    }
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocalStateCache {
    session: Option<Session>,
    students: Vec<Student>,
    modules: Vec<Module>,
    registered_modules: Vec<Module>,
    detail: Option<EntityDetail>,
    stale: bool,
}

impl LocalStateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// 当前学生会话的学号。管理员会话或无会话时为 `None`。
    pub fn student_id(&self) -> Option<&str> {
        self.session.as_ref().filter(|s| s.is_student()).and_then(|s| s.student_id.as_deref())
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// 当前会话已注册模块的详细信息 (来自最近一次注册集合刷新)。
    pub fn registered_modules(&self) -> &[Module] {
        &self.registered_modules
    }

    pub fn detail(&self) -> Option<&EntityDetail> {
        self.detail.as_ref()
    }

    /// 连接丢失后为 `true`，直到下一次目录刷新。
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// 以当前会话的权威注册集合做成员测试。
    pub fn is_module_registered(&self, module_code: &str) -> bool {
        self.session.as_ref().is_some_and(|s| s.registered_modules.contains(module_code))
    }

    /// 模块目录的表格视图。
    pub fn module_rows(&self) -> Vec<ModuleRow> {
        self.modules
            .iter()
            .map(|module| ModuleRow { module: module.clone(), registered: self.is_module_registered(&module.module_code) })
            .collect()
    }

    pub(crate) fn establish_session(&mut self, session: Session) {
        debug!("[LocalStateCache] 建立会话: {:?}", session.role);
        self.registered_modules.clear();
        self.session = Some(session);
    }

    /// 清除会话及其注册数据。返回之前是否存在会话。
    pub(crate) fn clear_session(&mut self) -> bool {
        self.registered_modules.clear();
        self.detail = None;
        self.session.take().is_some()
    }

    pub(crate) fn replace_students(&mut self, students: Vec<Student>) {
        self.students = students;
        self.stale = false;
    }

    pub(crate) fn replace_modules(&mut self, modules: Vec<Module>) {
        self.modules = modules;
        self.stale = false;
    }

    /// 用权威列表整体替换当前会话的注册集合。没有会话时返回 `false` 且不做任何修改。
    pub(crate) fn replace_registrations(&mut self, entries: Vec<RegisteredEntry>) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        session.registered_modules = entries.iter().map(|e| e.code().to_string()).collect();

        // 只给出代码的条目从模块目录中补全详细信息。
        let mut seen = BTreeSet::new();
        let mut details = Vec::with_capacity(entries.len());
        for entry in entries {
            if !seen.insert(entry.code().to_string()) {
                continue;
            }
            match entry {
                RegisteredEntry::Module(module) => details.push(module),
                RegisteredEntry::Code(code) => {
                    if let Some(module) = self.modules.iter().find(|m| m.module_code == code) {
                        details.push(module.clone());
                    }
                }
            }
        }
        self.registered_modules = details;
        true
    }

    pub(crate) fn set_detail(&mut self, detail: EntityDetail) {
        self.detail = Some(detail);
    }

    pub(crate) fn mark_stale(&mut self) {
        self.stale = true;
    }
}
