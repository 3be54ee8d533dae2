use base64::Engine;
use fieldburn::{
    AuditRecord, AuditSink, BurnError, BurnRequest, Burner, Field, FieldContent, FsDocumentStore,
    JsonlAuditLog, MemoryAuditLog, NormalizedRect, SignService, StoreConfig, fingerprint,
};
use lopdf::{Document as LoDocument, Object as LoObject, Stream as LoStream, dictionary};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(label: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "fieldburn_it_{}_{}_{}",
        label,
        std::process::id(),
        nanos
    ));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn base_pdf(pages: usize) -> Vec<u8> {
    let mut doc = LoDocument::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();
    for idx in 0..pages {
        let content = format!("0.9 0.9 0.9 rg 0 0 612 792 re f % page {}", idx + 1).into_bytes();
        let content_id = doc.add_object(LoStream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(LoObject::Reference(page_id));
    }
    doc.objects.insert(
        pages_id,
        LoObject::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    let mut out = Vec::new();
    doc.save_to(&mut out).expect("save");
    out
}

fn signature_png() -> Vec<u8> {
    let img = image::RgbaImage::from_fn(40, 20, |x, _| {
        if x % 2 == 0 {
            image::Rgba([0, 0, 0, 255])
        } else {
            image::Rgba([0, 0, 0, 0])
        }
    });
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .expect("png");
    out.into_inner()
}

fn page_text(bytes: &[u8], page_index: usize) -> String {
    let doc = LoDocument::load_mem(bytes).expect("load");
    let page_id = *doc.get_pages().values().nth(page_index).expect("page");
    String::from_utf8_lossy(&doc.get_page_content(page_id).expect("content")).into_owned()
}

fn seed_store(root: &Path, id: &str, bytes: &[u8]) -> FsDocumentStore {
    std::fs::write(root.join(id), bytes).expect("seed");
    FsDocumentStore::new(StoreConfig::with_root(root)).expect("store")
}

fn sign_body(document_id: &str, page_index: usize) -> String {
    let signature = base64::engine::general_purpose::STANDARD.encode(signature_png());
    format!(
        r#"{{"pdfId":"{document_id}","fields":[
            {{"pageIndex":{page_index},"xNorm":0.1,"yNorm":0.1,"wNorm":0.25,"hNorm":0.06,"type":"text","value":"Jane Roe"}},
            {{"pageIndex":{page_index},"xNorm":0.1,"yNorm":0.2,"wNorm":0.25,"hNorm":0.06,"type":"date","value":"2024-03-01"}},
            {{"pageIndex":{page_index},"xNorm":0.5,"yNorm":0.8,"wNorm":0.3,"hNorm":0.1,"type":"signature","value":"data:image/png;base64,{signature}"}},
            {{"pageIndex":{page_index},"xNorm":0.1,"yNorm":0.3,"wNorm":0.03,"hNorm":0.03,"type":"radio","value":true}},
            {{"pageIndex":{page_index},"xNorm":0.2,"yNorm":0.3,"wNorm":0.03,"hNorm":0.03,"type":"radio","value":"false"}}
        ]}}"#
    )
}

#[test]
fn sign_flow_stores_signed_copy_and_audits_it() {
    let root = temp_dir("sign");
    let base = base_pdf(2);
    let store = seed_store(&root, "contract.pdf", &base);
    let audit = Arc::new(MemoryAuditLog::default());

    struct Shared(Arc<MemoryAuditLog>);
    impl AuditSink for Shared {
        fn record(&self, record: &AuditRecord) -> Result<(), fieldburn::AuditError> {
            self.0.record(record)
        }
    }

    let service = SignService::new(Burner::builder().build().expect("burner"), store)
        .with_audit(Shared(audit.clone()));
    let outcome = service
        .sign_json(sign_body("contract.pdf", 1).as_bytes())
        .expect("sign");

    assert_eq!(outcome.response.url, "/files/contract-signed.pdf");
    assert_eq!(outcome.response.original_hash, fingerprint(&base));
    assert_ne!(outcome.response.result_hash, outcome.response.original_hash);
    assert!(outcome.diagnostics.is_empty());
    assert_eq!(outcome.summary.rendered, 5);
    assert_eq!(outcome.summary.pages_touched, vec![1]);

    let signed = std::fs::read(root.join("contract-signed.pdf")).expect("signed copy");
    assert_eq!(fingerprint(&signed), outcome.response.result_hash);
    assert_eq!(std::fs::read(root.join("contract.pdf")).expect("base"), base);

    let content = page_text(&signed, 1);
    assert!(content.contains("(Jane Roe) Tj"));
    assert!(content.contains("(2024-03-01) Tj"));
    assert!(content.contains(" Do\n"));
    assert!(content.contains("\nB\n"));
    assert!(content.contains("\nS\n"));
    assert!(!page_text(&signed, 0).contains("Jane Roe"));

    let records = audit.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].document_id, "contract.pdf");
    assert_eq!(records[0].result_hash, outcome.response.result_hash);
    assert_eq!(records[0].fields.len(), 5);
    assert_eq!(records[0].fields[2].kind, "signature");
    assert!(records[0].fields[2].value.is_none());
    assert_eq!(
        records[0].fields[2].value_sha256,
        Some(fingerprint(&signature_png()))
    );

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn out_of_range_page_stores_nothing() {
    let root = temp_dir("range");
    let store = seed_store(&root, "one.pdf", &base_pdf(1));
    let audit_path = root.join("audit").join("log.jsonl");
    let service = SignService::new(Burner::builder().build().expect("burner"), store)
        .with_audit(JsonlAuditLog::open(&audit_path).expect("audit"));

    let err = service
        .sign_json(sign_body("one.pdf", 4).as_bytes())
        .expect_err("out of range");
    assert!(matches!(err, BurnError::Validation(_)));
    assert_eq!(err.field_index(), Some(0));
    assert!(!root.join("one-signed.pdf").exists());
    assert_eq!(std::fs::read_to_string(&audit_path).expect("audit file"), "");

    let _ = std::fs::remove_dir_all(&root);
}

fn pageless_pdf() -> Vec<u8> {
    let mut doc = LoDocument::with_version("1.5");
    let pages_id = doc.add_object(dictionary! {
        "Type" => "Pages",
        "Kids" => Vec::<LoObject>::new(),
        "Count" => 0,
    });
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    let mut out = Vec::new();
    doc.save_to(&mut out).expect("save");
    out
}

#[test]
fn unusable_base_document_stores_nothing() {
    let root = temp_dir("invalid");
    let store = seed_store(&root, "blank.pdf", &pageless_pdf());
    let audit = Arc::new(MemoryAuditLog::default());

    struct Shared(Arc<MemoryAuditLog>);
    impl AuditSink for Shared {
        fn record(&self, record: &AuditRecord) -> Result<(), fieldburn::AuditError> {
            self.0.record(record)
        }
    }

    let service = SignService::new(Burner::builder().build().expect("burner"), store)
        .with_audit(Shared(audit.clone()));
    let body = r#"{"documentId":"blank.pdf","fields":[]}"#;
    let err = service.sign_json(body.as_bytes()).expect_err("no pages");
    assert!(matches!(err, BurnError::InvalidDocument(_)));
    assert!(!root.join("blank-signed.pdf").exists());
    assert!(audit.records().is_empty());
    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn unknown_document_is_not_found() {
    let root = temp_dir("missing");
    let service = SignService::new(
        Burner::builder().build().expect("burner"),
        FsDocumentStore::new(StoreConfig::with_root(&root)).expect("store"),
    );
    let err = service
        .sign_json(br#"{"documentId":"ghost.pdf","fields":[]}"#)
        .expect_err("missing");
    assert!(matches!(err, BurnError::NotFound(ref id) if id == "ghost.pdf"));
    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn undecodable_signature_is_skipped_but_text_is_burned() {
    let root = temp_dir("decode");
    let store = seed_store(&root, "form.pdf", &base_pdf(1));
    let service = SignService::new(Burner::builder().build().expect("burner"), store);
    let body = r#"{"documentId":"form.pdf","fields":[
        {"pageIndex":0,"xNorm":0.5,"yNorm":0.8,"wNorm":0.3,"hNorm":0.1,"type":"signature","value":"bm90IGFuIGltYWdl"},
        {"pageIndex":0,"xNorm":0.1,"yNorm":0.1,"wNorm":0.25,"hNorm":0.06,"type":"text","value":"Jane Roe"}
    ]}"#;
    let outcome = service.sign_json(body.as_bytes()).expect("sign");
    assert_eq!(outcome.diagnostics.len(), 1);
    assert_eq!(outcome.diagnostics[0].field_index, 0);
    assert_eq!(outcome.diagnostics[0].kind.as_str(), "decode_error");

    let signed = std::fs::read(root.join("form-signed.pdf")).expect("signed");
    let content = page_text(&signed, 0);
    assert!(content.contains("(Jane Roe) Tj"));
    assert!(!content.contains(" Do\n"));
    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn empty_field_list_keeps_document_bytes() {
    let root = temp_dir("empty");
    let base = base_pdf(1);
    let store = seed_store(&root, "plain.pdf", &base);
    let service = SignService::new(Burner::builder().build().expect("burner"), store);
    let outcome = service
        .sign_json(br#"{"documentId":"plain.pdf","fields":[]}"#)
        .expect("sign");
    assert_eq!(outcome.response.original_hash, outcome.response.result_hash);
    assert_eq!(std::fs::read(root.join("plain-signed.pdf")).expect("copy"), base);
    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn oversized_request_body_is_rejected() {
    let root = temp_dir("limit");
    let service = SignService::new(
        Burner::builder().build().expect("burner"),
        FsDocumentStore::new(StoreConfig::with_root(&root)).expect("store"),
    )
    .with_max_request_bytes(16)
    .expect("limit");
    let err = service
        .sign_json(br#"{"documentId":"a-rather-long-name.pdf"}"#)
        .expect_err("too big");
    assert!(matches!(err, BurnError::Request(_)));
    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn concurrent_burns_are_byte_identical() {
    let base = base_pdf(2);
    let request = BurnRequest::new(vec![
        Field::new(
            0,
            NormalizedRect::new(0.1, 0.1, 0.25, 0.06),
            FieldContent::Text("Jane Roe".into()),
        ),
        Field::new(
            1,
            NormalizedRect::new(0.5, 0.8, 0.3, 0.1),
            FieldContent::Signature(signature_png()),
        ),
        Field::new(
            1,
            NormalizedRect::new(0.1, 0.3, 0.03, 0.03),
            FieldContent::Radio(true),
        ),
    ]);
    let burner = Burner::builder().build().expect("burner");
    let expected = burner.burn(&base, &request).expect("reference burn");

    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| burner.burn(&base, &request).expect("burn")))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("thread"))
            .collect()
    });
    for result in results {
        assert_eq!(result.bytes, expected.bytes);
        assert_eq!(result.result_hash, expected.result_hash);
    }
}
