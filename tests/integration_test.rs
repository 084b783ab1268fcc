use paper_parser::config::Config;
use paper_parser::models::{MediaRelationship, Paragraph};
use paper_parser::orchestrator::{process_document, App};
use paper_parser::parser::ImageRegister;
use paper_parser::services::{InMemoryTaskStore, ParseOptions, ParseService, TaskStatus, TaskStore};
use paper_parser::utils::logging;
use paper_parser::{DocxDocument, DocxReader};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use zip::write::SimpleFileOptions;

const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

fn paragraphs(lines: &[&str]) -> Vec<Paragraph> {
    lines.iter().map(|l| Paragraph::from_text(*l)).collect()
}

fn service(image_dir: &Path) -> ParseService {
    ParseService::new(ParseOptions {
        image_dir: image_dir.to_path_buf(),
        image_url_prefix: "/api/paper/images".to_string(),
        preserve_fill_in_sub_questions: false,
    })
}

fn text_paragraph(text: &str) -> String {
    format!(r#"<w:p><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#, text)
}

/// 在内存中构建最小 docx
fn build_docx(body: &str, images: &[(&str, &str, &[u8])]) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buf);
        let options = SimpleFileOptions::default();

        zip.start_file("word/document.xml", options).unwrap();
        write!(
            zip,
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"
            xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"
            xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"
            xmlns:m="http://schemas.openxmlformats.org/officeDocument/2006/math">
<w:body>{body}</w:body></w:document>"#
        )
        .unwrap();

        zip.start_file("word/_rels/document.xml.rels", options).unwrap();
        let mut rels = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for (rel_id, target, _) in images {
            rels.push_str(&format!(
                r#"<Relationship Id="{rel_id}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="{target}"/>"#
            ));
        }
        rels.push_str("</Relationships>");
        zip.write_all(rels.as_bytes()).unwrap();

        for (_, target, data) in images {
            zip.start_file(format!("word/{target}"), options).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap();
    }
    buf.into_inner()
}

fn sample_docx() -> Vec<u8> {
    let mut body = String::new();
    for line in ["一、选择题", "1．下列说法正确的是", "A.对", "B.错", "【答案】A", "【难度】0.9"] {
        body.push_str(&text_paragraph(line));
    }
    body.push_str(
        r#"<w:p><w:r><w:t>2．如图所示</w:t></w:r><w:r><w:drawing><a:blip r:embed="rId9"/></w:drawing></w:r></w:p>"#,
    );
    for line in ["A.甲", "B.乙", "【答案】B"] {
        body.push_str(&text_paragraph(line));
    }
    build_docx(
        &body,
        &[
            ("rId8", "media/broken.bin", b"definitely not an image"),
            ("rId9", "media/image1.png", PNG),
        ],
    )
}

#[test]
fn test_scenario_single_choice_question() {
    let dir = tempfile::tempdir().unwrap();
    let paras = paragraphs(&["一、选择题", "1．下列说法正确的是", "A.对", "B.错", "【答案】A", "【难度】0.9"]);
    let outcome = service(dir.path()).parse_paragraphs(&paras, "task-1");

    assert_eq!(outcome.section_count, 1);
    assert_eq!(outcome.questions.len(), 1);
    let question = &outcome.questions[0];
    assert_eq!(question.number, "1");
    assert_eq!(question.question_type, "选择题");
    assert_eq!(question.options, Some(vec!["A. 对".to_string(), "B. 错".to_string()]));
    assert_eq!(question.answer, "A");
    assert_eq!(question.difficulty, Some(1));
    assert!(question.children.is_none());
}

#[test]
fn test_scenario_grouped_material() {
    let dir = tempfile::tempdir().unwrap();
    let paras = paragraphs(&[
        "二、简答题",
        "阅读下列材料，完成下面小题",
        "某段材料文本",
        "3．问题一",
        "4．问题二",
        "【答案】3．B 4．A",
        "【解析】3．解析一 4．解析二",
    ]);
    let outcome = service(dir.path()).parse_paragraphs(&paras, "task-2");

    assert_eq!(outcome.questions.len(), 1);
    let parent = &outcome.questions[0];
    assert!(parent.answer.is_empty());
    assert!(parent.options.is_none());
    let children = parent.children.as_ref().unwrap();
    assert_eq!(children.len(), 2);
    assert_eq!((children[0].number.as_str(), children[0].answer.as_str()), ("1", "B"));
    assert_eq!((children[1].number.as_str(), children[1].answer.as_str()), ("2", "A"));
    assert_eq!(children[0].analysis.as_deref(), Some("解析一"));
    assert_eq!(children[1].analysis.as_deref(), Some("解析二"));
}

#[test]
fn test_scenario_malformed_image_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let mut register = ImageRegister::new(dir.path());
    let media = [
        MediaRelationship {
            rel_id: "rId1".to_string(),
            target: "media/bad.bin".to_string(),
            data: b"garbage bytes".to_vec(),
        },
        MediaRelationship {
            rel_id: "rId2".to_string(),
            target: "media/image2.png".to_string(),
            data: PNG.to_vec(),
        },
    ];
    register.register_all(&media).unwrap();

    assert_eq!(register.image_count(), 1);
    assert_eq!(register.image_id_for("rId1"), None);
    assert_eq!(register.image_id_for("rId2"), Some(1));
}

#[test]
fn test_docx_end_to_end_with_image() {
    logging::init_test();
    let dir = tempfile::tempdir().unwrap();
    let document: DocxDocument = DocxReader::new().from_bytes(&sample_docx()).unwrap();
    assert_eq!(document.media.len(), 2);

    let outcome = service(dir.path()).parse_document(&document, "task-3").unwrap();
    assert_eq!(outcome.questions.len(), 2);
    assert_eq!(outcome.images.len(), 1);
    assert!(outcome.images[0].file_path.starts_with(dir.path().join("task-3")));

    let second = &outcome.questions[1];
    assert_eq!(second.answer, "B");
    assert_eq!(
        second.stem,
        r#"2．如图所示<img class="question-img inline" src="/api/paper/images/task-3/1" />"#
    );
}

#[test]
fn test_empty_document_yields_no_questions() {
    let dir = tempfile::tempdir().unwrap();
    let document = DocxReader::new()
        .from_bytes(&build_docx(&text_paragraph("没有大题标题的文字"), &[]))
        .unwrap();
    let outcome = service(dir.path()).parse_document(&document, "task-4").unwrap();
    assert_eq!(outcome.section_count, 0);
    assert!(outcome.questions.is_empty());
}

fn test_config(root: &Path) -> Config {
    Config {
        input_dir: root.join("input").display().to_string(),
        output_dir: root.join("output").display().to_string(),
        image_dir: root.join("images").display().to_string(),
        output_log_file: root.join("run.log").display().to_string(),
        ..Config::default()
    }
}

#[test]
fn test_process_document_records_task() {
    let root = tempfile::tempdir().unwrap();
    let config = test_config(root.path());
    let input = root.path().join("paper.docx");
    std::fs::write(&input, sample_docx()).unwrap();

    let store = Arc::new(InMemoryTaskStore::with_ttl_secs(config.task_ttl_secs));
    let outcome = tokio_test::block_on(process_document(&input, &config, store.clone())).unwrap();

    assert_eq!(outcome.question_count, 2);
    assert!(outcome.output_path.exists());
    let json = std::fs::read_to_string(&outcome.output_path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value[0]["type"], "选择题");
    assert_eq!(value[0]["knowledgePoints"], serde_json::json!([]));

    let record = store.get(&outcome.task_id).unwrap();
    assert_eq!(record.status, TaskStatus::Success);
    assert_eq!(record.metadata.file_name, "paper.docx");
}

#[test]
fn test_process_document_failure_is_recorded_once() {
    let root = tempfile::tempdir().unwrap();
    let config = test_config(root.path());
    let input = root.path().join("broken.docx");
    std::fs::write(&input, b"this is not a zip container").unwrap();

    let store = Arc::new(InMemoryTaskStore::with_ttl_secs(config.task_ttl_secs));
    let result = tokio_test::block_on(process_document(&input, &config, store.clone()));
    assert!(result.is_err());

    assert_eq!(store.len(), 1);
    assert!(!root.path().join("output").exists());
}

#[test]
fn test_failed_write_removes_task_images() {
    let root = tempfile::tempdir().unwrap();
    let config = test_config(root.path());
    let input = root.path().join("paper.docx");
    std::fs::write(&input, sample_docx()).unwrap();
    // 输出目录位置被普通文件占用，写入结果必然失败
    std::fs::write(&config.output_dir, b"occupied").unwrap();

    let store = Arc::new(InMemoryTaskStore::with_ttl_secs(config.task_ttl_secs));
    let result = tokio_test::block_on(process_document(&input, &config, store.clone()));
    assert!(result.is_err());

    let image_root = PathBuf::from(&config.image_dir);
    let leftover = std::fs::read_dir(&image_root)
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(leftover, 0);
    assert_eq!(store.len(), 1);
}

#[test]
fn test_app_run_scans_input_dir() {
    let root = tempfile::tempdir().unwrap();
    let config = test_config(root.path());
    std::fs::create_dir_all(&config.input_dir).unwrap();
    std::fs::write(PathBuf::from(&config.input_dir).join("a.docx"), sample_docx()).unwrap();
    std::fs::write(PathBuf::from(&config.input_dir).join("b.docx"), b"broken").unwrap();

    let (stats, store) = tokio_test::block_on(async {
        let app = App::initialize(config.clone()).await.unwrap();
        let stats = app.run(Vec::new()).await.unwrap();
        (stats, app.task_store())
    });

    assert_eq!(stats.total, 2);
    assert_eq!(stats.success, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.records, 2);

    assert_eq!(store.len(), 2);
    let succeeded = &stats.outcomes[0];
    assert_eq!(store.get(&succeeded.task_id).unwrap().status, TaskStatus::Success);

    let log = std::fs::read_to_string(&config.output_log_file).unwrap();
    assert!(log.contains("a.docx"));
    assert!(log.contains("b.docx"));
}
