//! docx 读取器
//!
//! 打开 zip 容器，按文档顺序读出正文段落（表格单元格内的段落展开到正文中），
//! 并取出全部图片关系的原始字节。

use crate::error::{AppError, AppResult};
use crate::models::{DocxDocument, MediaRelationship, Paragraph, Run, VertAlign};
use crate::parser::formula::math_node_from_xml;
use roxmltree::{Document as XmlDoc, Node};
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use tracing::{debug, warn};
use zip::read::ZipArchive;

const DOCUMENT_PART: &str = "word/document.xml";
const RELATIONSHIPS_PART: &str = "word/_rels/document.xml.rels";

/// docx 读取器
#[derive(Debug, Default, Clone, Copy)]
pub struct DocxReader;

impl DocxReader {
    pub fn new() -> Self {
        Self
    }

    /// 从磁盘读取
    pub fn open(&self, path: &Path) -> AppResult<DocxDocument> {
        let data = std::fs::read(path).map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        self.from_bytes(&data)
    }

    /// 从内存中的 docx 字节读取
    pub fn from_bytes(&self, data: &[u8]) -> AppResult<DocxDocument> {
        let mut zip = ZipArchive::new(Cursor::new(data))?;

        let document_xml =
            read_zip_text(&mut zip, DOCUMENT_PART).ok_or_else(|| AppError::missing_part(DOCUMENT_PART))?;
        let xml = XmlDoc::parse(strip_bom(&document_xml)).map_err(|e| AppError::malformed_xml(DOCUMENT_PART, e))?;

        let mut paragraphs = Vec::new();
        if let Some(body) = xml.descendants().find(|n| is_tag(n, "body")) {
            collect_block_children(&body, &mut paragraphs);
        }

        let media = read_media(&mut zip);
        debug!("读取到 {} 个段落, {} 个媒体关系", paragraphs.len(), media.len());

        Ok(DocxDocument { paragraphs, media })
    }
}

fn read_zip_text<R: Read + Seek>(zip: &mut ZipArchive<R>, path: &str) -> Option<String> {
    let mut file = zip.by_name(path).ok()?;
    let mut s = String::new();
    file.read_to_string(&mut s).ok()?;
    Some(s)
}

fn read_zip_bytes<R: Read + Seek>(zip: &mut ZipArchive<R>, path: &str) -> Option<Vec<u8>> {
    let mut file = zip.by_name(path).ok()?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf).ok()?;
    Some(buf)
}

fn strip_bom(s: &str) -> &str {
    const BOM: char = '\u{FEFF}';
    s.strip_prefix(BOM).unwrap_or(s)
}

fn is_tag(node: &Node, local: &str) -> bool {
    node.is_element() && node.tag_name().name() == local
}

fn get_attr_local<'a>(node: &Node<'a, 'a>, local: &str) -> Option<&'a str> {
    node.attributes()
        .find(|a| {
            let name = a.name();
            match name.rsplit_once(':') {
                Some((_, l)) => l == local,
                None => name == local,
            }
        })
        .map(|a| a.value())
}

fn child<'a>(node: &Node<'a, 'a>, local: &str) -> Option<Node<'a, 'a>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == local)
}

// ========== 正文 ==========

/// 正文块：段落直接收集，表格展开为单元格中的段落
fn collect_block_children(node: &Node, out: &mut Vec<Paragraph>) {
    for item in node.children().filter(|n| n.is_element()) {
        match item.tag_name().name() {
            "p" => out.push(parse_paragraph(&item)),
            "tbl" => {
                for p in item.descendants().filter(|n| is_tag(n, "p")) {
                    out.push(parse_paragraph(&p));
                }
            }
            "sdt" => {
                if let Some(content) = child(&item, "sdtContent") {
                    collect_block_children(&content, out);
                }
            }
            _ => {}
        }
    }
}

fn parse_paragraph(p: &Node) -> Paragraph {
    let mut runs = Vec::new();
    collect_inline(p, &mut runs);
    Paragraph::new(runs)
}

/// 段落内的行内元素；超链接、修订等容器递归展开
fn collect_inline(node: &Node, runs: &mut Vec<Run>) {
    for item in node.children().filter(|n| n.is_element()) {
        match item.tag_name().name() {
            "r" => parse_run(&item, runs),
            "oMath" => runs.push(Run::math(math_node_from_xml(&item))),
            "oMathPara" => {
                for math in item.children().filter(|n| is_tag(n, "oMath")) {
                    runs.push(Run::math(math_node_from_xml(&math)));
                }
            }
            "pPr" | "rPr" | "del" | "moveFrom" => {}
            _ => collect_inline(&item, runs),
        }
    }
}

fn parse_run(r: &Node, runs: &mut Vec<Run>) {
    let vert_align = child(r, "rPr")
        .and_then(|rpr| child(&rpr, "vertAlign"))
        .and_then(|n| get_attr_local(&n, "val"))
        .map(parse_vert_align)
        .unwrap_or_default();

    let mut text = String::new();
    for item in r.children().filter(|n| n.is_element()) {
        match item.tag_name().name() {
            "t" => text.push_str(item.text().unwrap_or("")),
            "tab" => text.push('\t'),
            "br" | "cr" => text.push('\n'),
            _ => {}
        }
    }

    let image_refs = image_refs_in(r);

    if !text.is_empty() {
        runs.push(Run {
            text,
            vert_align,
            ..Default::default()
        });
    }
    if !image_refs.is_empty() {
        runs.push(Run {
            image_refs,
            ..Default::default()
        });
    }
}

fn parse_vert_align(val: &str) -> VertAlign {
    match val.to_ascii_lowercase().as_str() {
        "sup" | "superscript" => VertAlign::Superscript,
        "sub" | "subscript" => VertAlign::Subscript,
        _ => VertAlign::Baseline,
    }
}

/// 文本块中引用的图片：DrawingML `a:blip` 与 VML `v:imagedata`，去重并保持顺序
fn image_refs_in(r: &Node) -> Vec<String> {
    let mut refs: Vec<String> = Vec::new();
    for node in r.descendants().filter(|n| n.is_element()) {
        let rel_id = match node.tag_name().name() {
            "blip" => get_attr_local(&node, "embed"),
            "imagedata" => get_attr_local(&node, "id"),
            _ => None,
        };
        if let Some(rel_id) = rel_id {
            if !refs.iter().any(|existing| existing == rel_id) {
                refs.push(rel_id.to_string());
            }
        }
    }
    refs
}

// ========== 媒体 ==========

/// 关系目标相对 `word/` 目录
fn resolve_target(target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        absolute.to_string()
    } else if let Some(parent) = target.strip_prefix("../") {
        parent.to_string()
    } else {
        format!("word/{}", target)
    }
}

fn read_media<R: Read + Seek>(zip: &mut ZipArchive<R>) -> Vec<MediaRelationship> {
    let Some(xml_text) = read_zip_text(zip, RELATIONSHIPS_PART) else {
        return Vec::new();
    };
    let xml = match XmlDoc::parse(strip_bom(&xml_text)) {
        Ok(d) => d,
        Err(e) => {
            warn!("⚠️ 关系文件解析失败，忽略全部图片: {}", e);
            return Vec::new();
        }
    };

    let mut media = Vec::new();
    for rel in xml.descendants().filter(|n| is_tag(n, "Relationship")) {
        let (Some(id), Some(target)) = (get_attr_local(&rel, "Id"), get_attr_local(&rel, "Target")) else {
            continue;
        };
        if get_attr_local(&rel, "TargetMode") == Some("External") {
            continue;
        }
        let rel_type = get_attr_local(&rel, "Type").unwrap_or("");
        if !rel_type.ends_with("/image") && !target.contains("image") {
            continue;
        }

        let path = resolve_target(target);
        match read_zip_bytes(zip, &path) {
            Some(data) => media.push(MediaRelationship {
                rel_id: id.to_string(),
                target: target.to_string(),
                data,
            }),
            None => warn!("⚠️ 图片关系 {} 指向的部件不存在: {}", id, path),
        }
    }
    media
}
