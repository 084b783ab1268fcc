//! OMML → MathML 简化转换
//!
//! 只处理文本（`m:r`）、分式（`m:f`）、上标（`m:sSup`）、下标（`m:sSub`），
//! 其余结构递归处理子节点后拼接。

use crate::models::MathNode;
use crate::parser::token::escape_html;
use roxmltree::{Document as XmlDoc, Node};
use tracing::debug;

const MATHML_OPEN: &str = r#"<math xmlns="http://www.w3.org/1998/Math/MathML">"#;
const MATHML_CLOSE: &str = "</math>";

/// 把 roxmltree 节点转成自有的公式树
pub fn math_node_from_xml(node: &Node) -> MathNode {
    let mut math = MathNode::new(node.tag_name().name());
    if node.tag_name().name() == "t" {
        math.text = node.text().map(str::to_string);
    }
    math.children = node
        .children()
        .filter(|c| c.is_element())
        .map(|c| math_node_from_xml(&c))
        .collect();
    math
}

/// 公式转换器
#[derive(Debug, Default, Clone, Copy)]
pub struct FormulaConverter;

impl FormulaConverter {
    pub fn new() -> Self {
        Self
    }

    /// 转换公式树；没有产生任何可显示内容时返回 `None`
    pub fn omml_to_mathml(&self, root: &MathNode) -> Option<String> {
        let mut body = String::new();
        self.process(root, &mut body);
        if body.is_empty() {
            return None;
        }
        Some(format!("{MATHML_OPEN}{body}{MATHML_CLOSE}"))
    }

    /// 从 OMML XML 文本转换，XML 不合法时返回 `None`
    pub fn convert_xml(&self, omml_xml: &str) -> Option<String> {
        let doc = match XmlDoc::parse(omml_xml) {
            Ok(doc) => doc,
            Err(e) => {
                debug!("OMML 解析失败: {}", e);
                return None;
            }
        };
        let root = math_node_from_xml(&doc.root_element());
        self.omml_to_mathml(&root)
    }

    fn process(&self, node: &MathNode, out: &mut String) {
        match node.tag.as_str() {
            "r" => {
                let text = find_text(node);
                if let Some(text) = text.filter(|t| !t.is_empty()) {
                    out.push_str("<mi>");
                    out.push_str(&escape_html(text));
                    out.push_str("</mi>");
                }
            }
            "f" => self.wrap(out, "mfrac", [node.child("num"), node.child("den")]),
            "sSup" => self.wrap(out, "msup", [node.child("e"), node.child("sup")]),
            "sSub" => self.wrap(out, "msub", [node.child("e"), node.child("sub")]),
            _ => {
                for child in &node.children {
                    self.process(child, out);
                }
            }
        }
    }

    /// 输出 `<tag><mrow>..</mrow><mrow>..</mrow></tag>`，缺失的部分跳过
    fn wrap(&self, out: &mut String, tag: &str, parts: [Option<&MathNode>; 2]) {
        out.push('<');
        out.push_str(tag);
        out.push('>');
        for part in parts.into_iter().flatten() {
            out.push_str("<mrow>");
            for child in &part.children {
                self.process(child, out);
            }
            out.push_str("</mrow>");
        }
        out.push_str("</");
        out.push_str(tag);
        out.push('>');
    }
}

/// 取文本块下第一个 `m:t` 的文本
fn find_text(node: &MathNode) -> Option<&str> {
    if node.tag == "t" {
        return node.text.as_deref();
    }
    node.children.iter().find_map(find_text)
}
