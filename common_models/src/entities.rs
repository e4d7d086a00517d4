// common_models/src/entities.rs

//! 后端拥有的实体模型：学生 (`Student`) 与课程模块 (`Module`)。
//!
//! 客户端只持有这些实体的只读副本。字段名在线上使用 camelCase，
//! 与后端网关输出的 JSON 保持一致。

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 课程模块代码，例如 `"CS101"`。
pub type ModuleCode = String;

/// 学生实体。
///
/// `registered_modules` 在线上是一个有序数组，但在客户端始终按集合处理：
/// 反序列化时重复项会被合并，成员判断使用集合查找。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    /// 学号。
    pub student_id: String,
    /// 显示名称。
    pub name: String,
    /// 电子邮箱。
    #[serde(default)]
    pub email: String,
    /// 已注册的课程模块代码集合。
    #[serde(default)]
    pub registered_modules: BTreeSet<ModuleCode>,
}

impl Student {
    /// 判断该学生是否已注册指定课程模块。
    pub fn is_registered_for(&self, module_code: &str) -> bool {
        self.registered_modules.contains(module_code)
    }
}

/// 课程模块实体。`credits` 为非负整数，后端必须以数值形式编码。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub module_code: ModuleCode,
    pub module_name: String,
    #[serde(default)]
    pub description: String,
    pub credits: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    /// 测试注册模块数组中的重复项在反序列化后被合并为集合。
    fn test_registered_modules_are_deduplicated() {
        let json = r#"{"studentId":"S1","name":"Ann","email":"ann@example.com","registeredModules":["CS101","CS102","CS101"]}"#;
        let student: Student = serde_json::from_str(json).expect("Student 反序列化失败");
        assert_eq!(student.registered_modules.len(), 2, "重复的模块代码应被合并");
        assert!(student.is_registered_for("CS102"));
        assert!(!student.is_registered_for("CS201"));
    }

    #[test]
    fn test_student_without_registered_modules_defaults_to_empty_set() {
        let student: Student = serde_json::from_str(r#"{"studentId":"S2","name":"Bo"}"#).unwrap();
        assert!(student.registered_modules.is_empty());
        assert_eq!(student.email, "");
    }

    #[test]
    /// 测试模块的 credits 必须为非负整数数值。
    fn test_module_credits_must_be_non_negative_number() {
        let ok: Module = serde_json::from_str(
            r#"{"moduleCode":"CS101","moduleName":"Intro","description":"Basics","credits":3}"#,
        )
        .unwrap();
        assert_eq!(ok.credits, 3);

        let negative = serde_json::from_str::<Module>(
            r#"{"moduleCode":"CS101","moduleName":"Intro","description":"Basics","credits":-1}"#,
        );
        assert!(negative.is_err(), "负数 credits 不应被接受");

        let textual = serde_json::from_str::<Module>(
            r#"{"moduleCode":"CS101","moduleName":"Intro","description":"Basics","credits":"3"}"#,
        );
        assert!(textual.is_err(), "字符串形式的 credits 不应被接受");
    }

    #[test]
    fn test_student_serializes_with_camel_case_fields() {
        let student = Student {
            student_id: "S001".to_string(),
            name: "John Doe".to_string(),
            email: "john@example.com".to_string(),
            registered_modules: ["CS101".to_string()].into_iter().collect(),
        };
        let value = serde_json::to_value(&student).unwrap();
        assert_eq!(value["studentId"], "S001");
        assert_eq!(value["registeredModules"], serde_json::json!(["CS101"]));
    }
}
