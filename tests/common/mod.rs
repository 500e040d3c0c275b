//! Shared helpers for the integration tests: in-memory PDFs and a scripted model.

#![allow(dead_code)]

use async_trait::async_trait;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use futures::stream;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::io::{Cursor, Write};
use std::sync::Mutex;
use std::time::Duration;
use summize::{AnalysisError, GenerativeModel, ModelRequest, Part, TextStream};

/// Route library logs to the test output; `RUST_LOG` selects the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ── PDF builder ──────────────────────────────────────────────────────────────

/// One embedded image: a solid 2×2 RGB square (raw, Flate-compressed, Flate
/// over PNG `Up` prediction, or a JPEG wrapped in Flate), or an image whose
/// sample buffer is too short to decode.
#[derive(Debug, Clone, Copy)]
pub enum Img {
    Solid([u8; 3]),
    Flate([u8; 3]),
    FlatePredicted([u8; 3]),
    FlateJpeg([u8; 3]),
    Broken,
}

/// A page with a line of text and its images, drawn in order.
pub struct PageLayout {
    pub text: &'static str,
    pub images: Vec<Img>,
}

pub fn page(text: &'static str, images: Vec<Img>) -> PageLayout {
    PageLayout { text, images }
}

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).expect("deflate");
    enc.finish().expect("deflate")
}

/// Prefix every row with the PNG `Up` filter byte and store differences.
fn png_up(samples: &[u8], row_len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() + samples.len() / row_len);
    let mut previous = vec![0u8; row_len];
    for row in samples.chunks(row_len) {
        out.push(2);
        out.extend(row.iter().zip(&previous).map(|(c, p)| c.wrapping_sub(*p)));
        previous = row.to_vec();
    }
    out
}

fn jpeg(rgb: [u8; 3]) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(2, 2, image::Rgb(rgb));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Jpeg)
        .expect("encode JPEG");
    buf
}

fn image_object(img: Img) -> Stream {
    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => 2,
        "Height" => 2,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
    };
    let content = match img {
        Img::Solid(rgb) => rgb.repeat(4),
        Img::Flate(rgb) => {
            dict.set("Filter", "FlateDecode");
            zlib(&rgb.repeat(4))
        }
        Img::FlatePredicted(rgb) => {
            dict.set("Filter", "FlateDecode");
            dict.set(
                "DecodeParms",
                dictionary! { "Predictor" => 15, "Colors" => 3, "BitsPerComponent" => 8, "Columns" => 2 },
            );
            zlib(&png_up(&rgb.repeat(4), 6))
        }
        Img::FlateJpeg(rgb) => {
            dict.set(
                "Filter",
                vec![Object::Name(b"FlateDecode".to_vec()), Object::Name(b"DCTDecode".to_vec())],
            );
            zlib(&jpeg(rgb))
        }
        Img::Broken => {
            dict.set("Width", 10);
            dict.set("Height", 10);
            vec![1, 2, 3]
        }
    };
    Stream::new(dict, content)
}

fn text_ops(text: &str) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 12.into()]),
        Operation::new("Td", vec![72.into(), 700.into()]),
        Operation::new("Tj", vec![Object::string_literal(text)]),
        Operation::new("ET", vec![]),
    ]
}

fn draw_ops(name: &str) -> Vec<Operation> {
    vec![
        Operation::new("q", vec![]),
        Operation::new(
            "cm",
            vec![100.into(), 0.into(), 0.into(), 100.into(), 72.into(), 400.into()],
        ),
        Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]),
        Operation::new("Q", vec![]),
    ]
}

fn finish(mut doc: Document, pages_id: ObjectId, kids: Vec<Object>) -> Vec<u8> {
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("save test PDF");
    buf
}

fn add_page(
    doc: &mut Document,
    pages_id: ObjectId,
    font_id: ObjectId,
    text: &str,
    xobjects: Vec<(String, ObjectId)>,
) -> Object {
    let mut ops = text_ops(text);
    let mut resources_x = Dictionary::new();
    for (name, id) in xobjects {
        ops.extend(draw_ops(&name));
        resources_x.set(name, id);
    }
    let content = Content { operations: ops };
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        content.encode().expect("encode content"),
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "Font" => dictionary! { "F1" => font_id },
            "XObject" => resources_x,
        },
    });
    page_id.into()
}

fn new_doc() -> (Document, ObjectId, ObjectId) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    (doc, pages_id, font_id)
}

/// Build a PDF with the given pages.
pub fn build_pdf(pages: &[PageLayout]) -> Vec<u8> {
    let (mut doc, pages_id, font_id) = new_doc();
    let mut kids = Vec::new();
    for layout in pages {
        let xobjects = layout
            .images
            .iter()
            .enumerate()
            .map(|(i, img)| (format!("Im{}", i + 1), doc.add_object(image_object(*img))))
            .collect();
        kids.push(add_page(&mut doc, pages_id, font_id, layout.text, xobjects));
    }
    finish(doc, pages_id, kids)
}

/// Two pages drawing the same image object, the second page also drawing a new one.
pub fn shared_image_pdf(shared: [u8; 3], second: [u8; 3]) -> Vec<u8> {
    let (mut doc, pages_id, font_id) = new_doc();
    let shared_id = doc.add_object(image_object(Img::Solid(shared)));
    let second_id = doc.add_object(image_object(Img::Solid(second)));
    let first = add_page(
        &mut doc,
        pages_id,
        font_id,
        "Figure one",
        vec![("Im1".into(), shared_id)],
    );
    let other = add_page(
        &mut doc,
        pages_id,
        font_id,
        "Figure one again",
        vec![("Im1".into(), shared_id), ("Im2".into(), second_id)],
    );
    finish(doc, pages_id, vec![first, other])
}

/// A typical three-page paper with five figures.
pub fn five_figure_paper() -> Vec<u8> {
    build_pdf(&[
        page("Abstract We study attention.", vec![Img::Solid([255, 0, 0])]),
        page(
            "Method We stack layers.",
            vec![Img::Solid([0, 255, 0]), Img::Solid([0, 0, 255])],
        ),
        page(
            "Results It works.",
            vec![Img::Solid([255, 255, 0]), Img::Solid([0, 255, 255])],
        ),
    ])
}

/// Colour of the top-left pixel of an encoded image.
pub fn first_pixel(bytes: &[u8]) -> [u8; 3] {
    image::load_from_memory(bytes)
        .expect("decodable image")
        .to_rgb8()
        .get_pixel(0, 0)
        .0
}

// ── Scripted model ───────────────────────────────────────────────────────────

/// Answers every request with its job label, with optional per-job delays,
/// failures and streaming fragments.
#[derive(Default)]
pub struct ScriptedModel {
    pub delays_ms: Vec<(String, u64)>,
    pub failing: Vec<String>,
    /// Jobs that fail on their first call only.
    pub flaky: Mutex<Vec<String>>,
    /// Fragments streamed for the summary; empty → the default single chunk.
    pub fragments: Vec<String>,
    /// Prefix added to every reply, to tell runs apart.
    pub tag: String,
    pub requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tagged(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Self::default()
        }
    }

    pub fn delay(mut self, job: &str, ms: u64) -> Self {
        self.delays_ms.push((job.to_string(), ms));
        self
    }

    pub fn fail(mut self, job: &str) -> Self {
        self.failing.push(job.to_string());
        self
    }

    pub fn flaky(self, job: &str) -> Self {
        self.flaky.lock().unwrap().push(job.to_string());
        self
    }

    pub fn stream(mut self, fragments: &[&str]) -> Self {
        self.fragments = fragments.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn jobs(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.job.clone())
            .collect()
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &ModelRequest) -> Result<String, AnalysisError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some((_, ms)) = self.delays_ms.iter().find(|(job, _)| *job == request.job) {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
        }
        let flaked = {
            let mut flaky = self.flaky.lock().unwrap();
            let hit = flaky.iter().position(|job| *job == request.job);
            hit.map(|i| flaky.remove(i)).is_some()
        };
        if flaked || self.failing.contains(&request.job) {
            return Err(AnalysisError::RemoteService {
                job: request.job.clone(),
                detail: "HTTP 503: backend unavailable".to_string(),
            });
        }
        let images = request
            .parts
            .iter()
            .filter(|p| matches!(p, Part::Image(_)))
            .count();
        Ok(format!("{}{} ({} image parts)", self.tag, request.job, images))
    }

    async fn generate_stream(&self, request: &ModelRequest) -> Result<TextStream, AnalysisError> {
        if self.fragments.is_empty() {
            let text = self.generate(request).await?;
            return Ok(Box::pin(stream::once(async move { Ok(text) })));
        }
        self.requests.lock().unwrap().push(request.clone());
        let items: Vec<Result<String, AnalysisError>> =
            self.fragments.iter().cloned().map(Ok).collect();
        Ok(Box::pin(stream::iter(items)))
    }
}
