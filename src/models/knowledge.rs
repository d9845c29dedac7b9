use serde::{Deserialize, Serialize};

/// 子知识点（叶子节点）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubPoint {
    pub id: String,
    pub name: String,
}

/// 一级知识点，只有一层子节点
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgePointNode {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub children: Vec<SubPoint>,
}

impl KnowledgePointNode {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            children: Vec::new(),
        }
    }
}

/// 默认的高中数学知识点
pub fn default_tree() -> Vec<KnowledgePointNode> {
    const TREE: &[(&str, &str, &[&str])] = &[
        ("kp-set", "集合与常用逻辑", &["集合运算", "充分必要条件"]),
        ("kp-func", "函数", &["函数性质", "指数与对数函数", "二次函数"]),
        ("kp-deriv", "导数及其应用", &["导数的几何意义", "单调性与极值"]),
        ("kp-trig", "三角函数", &["三角恒等变换", "解三角形"]),
        ("kp-seq", "数列", &["等差数列", "等比数列", "数列求和"]),
        ("kp-ineq", "不等式", &["基本不等式", "线性规划"]),
        ("kp-solid", "立体几何", &["空间向量", "三视图与体积"]),
        ("kp-conic", "解析几何", &["直线与圆", "圆锥曲线"]),
        ("kp-prob", "概率与统计", &["古典概型", "分布列与期望"]),
        ("kp-complex", "复数", &[]),
    ];

    TREE.iter()
        .map(|(id, name, subs)| KnowledgePointNode {
            id: id.to_string(),
            name: name.to_string(),
            children: subs
                .iter()
                .enumerate()
                .map(|(i, sub)| SubPoint {
                    id: format!("{}-{}", id, i + 1),
                    name: sub.to_string(),
                })
                .collect(),
        })
        .collect()
}
