//! Text and image extraction with lopdf.
//!
//! Both outputs are pure functions of the input bytes:
//!
//! * **Text** — each page's text in page order, concatenated with no extra
//!   separator.
//! * **Images** — pages in order; within a page the `/XObject` resources in
//!   their listed order, descending into Form XObjects. An image object
//!   referenced again later (a logo on every page) is listed once, at its
//!   first occurrence.
//!
//! Transport filters (`FlateDecode` with PNG/TIFF predictors, `LZWDecode`,
//! `ASCIIHexDecode`, `ASCII85Decode`, `RunLengthDecode`) are undone here;
//! lopdf refuses to decompress streams typed as images. JPEG (`DCTDecode`)
//! data is then returned as-is, and everything else is rebuilt from raw
//! samples into PNG unless it already holds an encoded image. An image that
//! cannot be decoded is skipped and logged; it never aborts the extraction.
//!
//! Encrypted documents are opened with the empty user password, which is how
//! most "copy-protected" papers ship.

use crate::error::SummizeError;
use flate2::read::ZlibDecoder;
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::filters::png;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::{BTreeMap, HashSet};
use std::io::{Cursor, Read};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Form XObjects can nest; real documents rarely go past two levels.
const MAX_FORM_DEPTH: usize = 8;

/// Everything derived from one PDF.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub text: String,
    /// Encoded image files (JPEG or PNG), in document order.
    pub images: Vec<Vec<u8>>,
    pub page_count: usize,
    /// Image objects that were found but could not be decoded.
    pub skipped_images: usize,
}

/// Extract the full text of a PDF.
pub fn extract_text(bytes: &[u8]) -> Result<String, SummizeError> {
    let doc = load(bytes)?;
    Ok(collect_text(&doc, &doc.get_pages()))
}

/// Extract every decodable embedded image of a PDF.
pub fn extract_images(bytes: &[u8]) -> Result<Vec<Vec<u8>>, SummizeError> {
    let doc = load(bytes)?;
    let (images, _) = collect_images(&doc, &doc.get_pages());
    Ok(images)
}

/// Extract text and images with a single parse.
pub fn extract(bytes: &[u8]) -> Result<Extraction, SummizeError> {
    let doc = load(bytes)?;
    let pages = doc.get_pages();
    let text = collect_text(&doc, &pages);
    let (images, skipped_images) = collect_images(&doc, &pages);

    info!(
        "Extracted {} chars and {} images from {} pages ({} images skipped)",
        text.chars().count(),
        images.len(),
        pages.len(),
        skipped_images
    );

    Ok(Extraction {
        text,
        images,
        page_count: pages.len(),
        skipped_images,
    })
}

/// Run [`extract`] on the blocking pool; lopdf parsing is CPU-bound.
pub async fn extract_blocking(bytes: Arc<Vec<u8>>) -> Result<Extraction, SummizeError> {
    tokio::task::spawn_blocking(move || extract(&bytes))
        .await
        .map_err(|e| SummizeError::Internal(format!("extraction task failed: {e}")))?
}

/// Validate the PDF magic and parse the document.
fn load(bytes: &[u8]) -> Result<Document, SummizeError> {
    // The header may be preceded by junk, but must start within the first KiB.
    let head = &bytes[..bytes.len().min(1024)];
    if !head.windows(4).any(|w| w == b"%PDF") {
        let magic: Vec<u8> = bytes.iter().take(4).copied().collect();
        return Err(SummizeError::MalformedDocument {
            detail: format!("missing %PDF header (first bytes: {magic:?})"),
        });
    }

    let mut doc = Document::load_mem(bytes).map_err(|e| SummizeError::MalformedDocument {
        detail: e.to_string(),
    })?;

    if doc.trailer.get(b"Encrypt").is_ok() {
        doc.decrypt("")
            .map_err(|e| SummizeError::MalformedDocument {
                detail: format!("encrypted PDF cannot be opened without a password: {e}"),
            })?;
        debug!("Decrypted document with the empty user password");
    }
    Ok(doc)
}

fn collect_text(doc: &Document, pages: &BTreeMap<u32, ObjectId>) -> String {
    let mut text = String::new();
    for &page_num in pages.keys() {
        match doc.extract_text(&[page_num]) {
            Ok(page_text) => text.push_str(&page_text),
            Err(e) => warn!("Page {page_num}: text extraction failed: {e}"),
        }
    }
    text
}

fn collect_images(doc: &Document, pages: &BTreeMap<u32, ObjectId>) -> (Vec<Vec<u8>>, usize) {
    let mut seen = HashSet::new();
    let mut refs = Vec::new();
    for (&page_num, &page_id) in pages {
        if let Some(resources) = page_resources(doc, page_id) {
            let before = refs.len();
            walk_xobjects(doc, resources, &mut seen, &mut refs, 0);
            debug!("Page {}: {} new image objects", page_num, refs.len() - before);
        }
    }

    let mut images = Vec::with_capacity(refs.len());
    let mut skipped = 0;
    for (position, id) in refs.into_iter().enumerate() {
        let Ok(Object::Stream(stream)) = doc.get_object(id) else {
            skipped += 1;
            continue;
        };
        match image_bytes(doc, stream) {
            Ok(bytes) => images.push(bytes),
            Err(reason) => {
                warn!(
                    "Skipping image object {} {} (#{}): {}",
                    id.0,
                    id.1,
                    position + 1,
                    reason
                );
                skipped += 1;
            }
        }
    }
    (images, skipped)
}

/// The page's `/Resources`, inherited from ancestors when absent.
fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..32 {
        if let Ok(res) = node.get(b"Resources") {
            return resolve_dict(doc, res);
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn walk_xobjects(
    doc: &Document,
    resources: &Dictionary,
    seen: &mut HashSet<ObjectId>,
    out: &mut Vec<ObjectId>,
    depth: usize,
) {
    let Some(xobjects) = resources
        .get(b"XObject")
        .ok()
        .and_then(|o| resolve_dict(doc, o))
    else {
        return;
    };

    for (_name, obj) in xobjects.iter() {
        let Object::Reference(id) = obj else {
            continue;
        };
        if !seen.insert(*id) {
            continue;
        }
        let Ok(Object::Stream(stream)) = doc.get_object(*id) else {
            continue;
        };
        match name_of(&stream.dict, b"Subtype") {
            Some(b"Image") => out.push(*id),
            Some(b"Form") if depth < MAX_FORM_DEPTH => {
                if let Some(inner) = stream
                    .dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|o| resolve_dict(doc, o))
                {
                    walk_xobjects(doc, inner, seen, out, depth + 1);
                }
            }
            _ => {}
        }
    }
}

// ── Decoding ─────────────────────────────────────────────────────────────

/// Turn one image XObject into an encoded image file.
fn image_bytes(doc: &Document, stream: &Stream) -> Result<Vec<u8>, String> {
    let filters = filter_names(&stream.dict);
    let (content, codec) = decode_filters(doc, stream, &filters)?;

    match codec {
        Some(b"DCTDecode") | Some(b"DCT") => {
            image::load_from_memory_with_format(&content, ImageFormat::Jpeg)
                .map_err(|e| format!("invalid JPEG data: {e}"))?;
            return Ok(content);
        }
        Some(b"JPXDecode") => return Err("JPEG 2000 images are not supported".to_string()),
        Some(_) => return Err("bi-level fax/JBIG2 images are not supported".to_string()),
        None => {}
    }

    // Some producers store a complete PNG/TIFF file in the stream.
    if image::guess_format(&content).is_ok() && image::load_from_memory(&content).is_ok() {
        return Ok(content);
    }

    let img = reconstruct_raw_image(doc, &stream.dict, &content)?;
    encode_png(&img)
}

/// Rebuild an image from raw 8-bit samples using the stream's metadata.
fn reconstruct_raw_image(
    doc: &Document,
    dict: &Dictionary,
    samples: &[u8],
) -> Result<DynamicImage, String> {
    let width = int_of(dict, b"Width").ok_or("missing /Width")?;
    let height = int_of(dict, b"Height").ok_or("missing /Height")?;
    let bpc = int_of(dict, b"BitsPerComponent").unwrap_or(8);
    if bpc != 8 {
        return Err(format!("unsupported BitsPerComponent {bpc}"));
    }
    if width == 0 || height == 0 {
        return Err(format!("empty image {width}x{height}"));
    }

    let space = color_space(doc, dict)?;
    let pixels = width
        .checked_mul(height)
        .ok_or_else(|| format!("image too large: {width}x{height}"))? as usize;
    let expected = pixels
        .checked_mul(space.components())
        .ok_or_else(|| format!("image too large: {width}x{height}"))?;
    if samples.len() < expected {
        return Err(format!(
            "sample buffer too small: {} bytes, expected {} ({}x{}x{})",
            samples.len(),
            expected,
            width,
            height,
            space.components()
        ));
    }
    let samples = &samples[..expected];
    let (w, h) = match (u32::try_from(width), u32::try_from(height)) {
        (Ok(w), Ok(h)) => (w, h),
        _ => return Err(format!("image too large: {width}x{height}")),
    };

    let img = match space {
        ColorSpace::Gray => GrayImage::from_raw(w, h, samples.to_vec()).map(DynamicImage::ImageLuma8),
        ColorSpace::Rgb => RgbImage::from_raw(w, h, samples.to_vec()).map(DynamicImage::ImageRgb8),
        // A tint of 0 is no ink.
        ColorSpace::Tint => {
            let gray = samples.iter().map(|t| 255 - t).collect();
            GrayImage::from_raw(w, h, gray).map(DynamicImage::ImageLuma8)
        }
        ColorSpace::Cmyk => {
            let rgb: Vec<u8> = samples.chunks_exact(4).flat_map(cmyk_to_rgb).collect();
            RgbImage::from_raw(w, h, rgb).map(DynamicImage::ImageRgb8)
        }
        ColorSpace::Indexed { base, ref palette } => {
            let mut rgb = Vec::with_capacity(pixels * 3);
            for &index in samples {
                let entry = index as usize * base.components();
                let color = palette
                    .get(entry..entry + base.components())
                    .ok_or_else(|| format!("palette index {index} out of range"))?;
                match base {
                    BaseSpace::Gray => rgb.extend_from_slice(&[color[0]; 3]),
                    BaseSpace::Rgb => rgb.extend_from_slice(color),
                    BaseSpace::Cmyk => rgb.extend(cmyk_to_rgb(color)),
                }
            }
            RgbImage::from_raw(w, h, rgb).map(DynamicImage::ImageRgb8)
        }
    };
    img.ok_or_else(|| "pixel buffer does not match dimensions".to_string())
}

fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, String> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| format!("PNG encoding failed: {e}"))?;
    Ok(buf)
}

fn cmyk_to_rgb(cmyk: &[u8]) -> [u8; 3] {
    let k = 255 - cmyk[3] as u16;
    let channel = |c: u8| ((255 - c as u16) * k / 255) as u8;
    [channel(cmyk[0]), channel(cmyk[1]), channel(cmyk[2])]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BaseSpace {
    Gray,
    Rgb,
    Cmyk,
}

impl BaseSpace {
    fn components(self) -> usize {
        match self {
            BaseSpace::Gray => 1,
            BaseSpace::Rgb => 3,
            BaseSpace::Cmyk => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ColorSpace {
    Gray,
    Rgb,
    Cmyk,
    /// A single colorant (`Separation`, one-ink `DeviceN`), drawn as gray.
    Tint,
    Indexed { base: BaseSpace, palette: Vec<u8> },
}

impl ColorSpace {
    /// Samples per pixel in the stream.
    fn components(&self) -> usize {
        match self {
            ColorSpace::Gray | ColorSpace::Tint => 1,
            ColorSpace::Rgb => 3,
            ColorSpace::Cmyk => 4,
            ColorSpace::Indexed { .. } => 1,
        }
    }
}

impl From<BaseSpace> for ColorSpace {
    fn from(base: BaseSpace) -> Self {
        match base {
            BaseSpace::Gray => ColorSpace::Gray,
            BaseSpace::Rgb => ColorSpace::Rgb,
            BaseSpace::Cmyk => ColorSpace::Cmyk,
        }
    }
}

/// Interpret `/ColorSpace`. An image without one is taken as RGB.
fn color_space(doc: &Document, dict: &Dictionary) -> Result<ColorSpace, String> {
    match dict.get(b"ColorSpace") {
        Ok(obj) => parse_color_space(doc, resolve(doc, obj)),
        Err(_) => Ok(ColorSpace::Rgb),
    }
}

fn parse_color_space(doc: &Document, obj: &Object) -> Result<ColorSpace, String> {
    if let Some(base) = base_space(doc, obj) {
        return Ok(base.into());
    }

    let unsupported = || format!("unsupported colour space /{}", color_space_name(doc, obj));
    let Object::Array(arr) = obj else {
        return Err(unsupported());
    };
    let Some(Object::Name(family)) = arr.first() else {
        return Err(unsupported());
    };
    match family.as_slice() {
        b"Indexed" | b"I" if arr.len() >= 4 => {
            let base = base_space(doc, &arr[1]).ok_or_else(|| {
                format!(
                    "unsupported Indexed base colour space /{}",
                    color_space_name(doc, &arr[1])
                )
            })?;
            let palette = match resolve(doc, &arr[3]) {
                Object::String(bytes, _) => bytes.clone(),
                Object::Stream(s) => decode_filters(doc, s, &filter_names(&s.dict))
                    .map(|(data, _)| data)
                    .unwrap_or_else(|_| s.content.clone()),
                _ => Vec::new(),
            };
            Ok(ColorSpace::Indexed { base, palette })
        }
        b"Separation" => Ok(ColorSpace::Tint),
        b"DeviceN" => {
            let inks = match arr.get(1).map(|o| resolve(doc, o)) {
                Some(Object::Array(names)) => names.len(),
                _ => 0,
            };
            let alternate = arr.get(2).and_then(|o| base_space(doc, o));
            match (inks, alternate) {
                (1, _) => Ok(ColorSpace::Tint),
                // Process-colour DeviceN: the inks are the alternate space's own.
                (n, Some(base)) if n == base.components() => Ok(base.into()),
                (n, _) => Err(format!("unsupported colour space /DeviceN with {n} inks")),
            }
        }
        _ => Err(unsupported()),
    }
}

fn color_space_name(doc: &Document, obj: &Object) -> String {
    match resolve(doc, obj) {
        Object::Name(n) => String::from_utf8_lossy(n).into_owned(),
        Object::Array(arr) => match arr.first() {
            Some(Object::Name(n)) => String::from_utf8_lossy(n).into_owned(),
            _ => "?".to_string(),
        },
        _ => "?".to_string(),
    }
}

/// Resolve a device-like colour space (device names, ICC profiles, calibrated spaces).
fn base_space(doc: &Document, obj: &Object) -> Option<BaseSpace> {
    match resolve(doc, obj) {
        Object::Name(n) => match n.as_slice() {
            b"DeviceGray" | b"G" | b"CalGray" => Some(BaseSpace::Gray),
            b"DeviceRGB" | b"RGB" | b"CalRGB" => Some(BaseSpace::Rgb),
            b"DeviceCMYK" | b"CMYK" => Some(BaseSpace::Cmyk),
            _ => None,
        },
        Object::Array(arr) => match arr.first() {
            Some(Object::Name(n)) if n == b"ICCBased" => {
                let components = arr.get(1).and_then(|o| match resolve(doc, o) {
                    Object::Stream(s) => int_of(&s.dict, b"N"),
                    _ => None,
                });
                Some(match components {
                    Some(1) => BaseSpace::Gray,
                    Some(4) => BaseSpace::Cmyk,
                    _ => BaseSpace::Rgb,
                })
            }
            Some(Object::Name(n)) if n == b"CalGray" => Some(BaseSpace::Gray),
            Some(Object::Name(n)) if n == b"CalRGB" || n == b"Lab" => Some(BaseSpace::Rgb),
            _ => None,
        },
        _ => None,
    }
}

// ── Filters ──────────────────────────────────────────────────────────────

/// Undo the stream's transport filters in order, stopping at the first image
/// codec (`DCTDecode`, `JPXDecode`, …), which is returned alongside the data.
fn decode_filters<'f>(
    doc: &Document,
    stream: &Stream,
    filters: &'f [Vec<u8>],
) -> Result<(Vec<u8>, Option<&'f [u8]>), String> {
    let mut data = stream.content.clone();
    for (index, filter) in filters.iter().enumerate() {
        let params = decode_params(doc, &stream.dict, index);
        data = match filter.as_slice() {
            b"FlateDecode" | b"Fl" => undo_predictor(inflate(&data)?, params)?,
            b"LZWDecode" | b"LZW" => lzw_decode(data, params)?,
            b"ASCIIHexDecode" | b"AHx" => ascii_hex_decode(&data)?,
            b"ASCII85Decode" | b"A85" => ascii85_decode(&data)?,
            b"RunLengthDecode" | b"RL" => run_length_decode(&data),
            b"DCTDecode" | b"DCT" | b"JPXDecode" | b"CCITTFaxDecode" | b"CCF"
            | b"JBIG2Decode" => return Ok((data, Some(filter.as_slice()))),
            other => {
                return Err(format!(
                    "unsupported filter /{}",
                    String::from_utf8_lossy(other)
                ))
            }
        };
    }
    Ok((data, None))
}

/// `/DecodeParms` for the filter at `index`; an array holds one entry per filter.
fn decode_params<'a>(doc: &'a Document, dict: &'a Dictionary, index: usize) -> Option<&'a Dictionary> {
    let params = dict.get(b"DecodeParms").or_else(|_| dict.get(b"DP")).ok()?;
    match resolve(doc, params) {
        Object::Dictionary(d) if index == 0 => Some(d),
        Object::Array(arr) => arr.get(index).and_then(|o| resolve_dict(doc, o)),
        _ => None,
    }
}

fn inflate(data: &[u8]) -> Result<Vec<u8>, String> {
    let mut out = Vec::new();
    match ZlibDecoder::new(data).read_to_end(&mut out) {
        Ok(_) => Ok(out),
        // Truncated streams and bad checksums still leave usable samples.
        Err(e) if !out.is_empty() => {
            debug!("FlateDecode stopped early after {} bytes: {e}", out.len());
            Ok(out)
        }
        Err(e) => Err(format!("FlateDecode failed: {e}")),
    }
}

/// Reverse a TIFF (2) or PNG (10–15) predictor.
fn undo_predictor(data: Vec<u8>, params: Option<&Dictionary>) -> Result<Vec<u8>, String> {
    let Some(params) = params else {
        return Ok(data);
    };
    let param = |key: &[u8], default: u64| int_of(params, key).unwrap_or(default).max(1) as usize;
    let colors = param(b"Colors", 1);
    let bpc = param(b"BitsPerComponent", 8);
    let columns = param(b"Columns", 1);

    match int_of(params, b"Predictor").unwrap_or(1) {
        1 => Ok(data),
        2 if bpc == 8 => {
            let mut data = data;
            for row in data.chunks_mut(colors * columns) {
                for i in colors..row.len() {
                    row[i] = row[i].wrapping_add(row[i - colors]);
                }
            }
            Ok(data)
        }
        2 => Err(format!("TIFF predictor with {bpc}-bit components is not supported")),
        10..=15 => {
            let (bytes_per_pixel, per_row) = if bpc >= 8 {
                (colors * bpc / 8, columns)
            } else {
                (1, (colors * bpc * columns).div_ceil(8))
            };
            png::decode_frame(&data, bytes_per_pixel, per_row)
                .map_err(|e| format!("PNG predictor: {e}"))
        }
        other => Err(format!("unknown predictor {other}")),
    }
}

/// LZW goes through lopdf on a bare stream; it only refuses image-typed ones.
fn lzw_decode(data: Vec<u8>, params: Option<&Dictionary>) -> Result<Vec<u8>, String> {
    let mut dict = Dictionary::new();
    dict.set("Filter", "LZWDecode");
    if let Some(params) = params {
        dict.set("DecodeParms", params.clone());
    }
    Stream::new(dict, data)
        .decompressed_content()
        .map_err(|e| format!("LZWDecode failed: {e}"))
}

fn ascii_hex_decode(data: &[u8]) -> Result<Vec<u8>, String> {
    let mut nibbles = Vec::with_capacity(data.len());
    for &b in data {
        let nibble = match b {
            b'>' => break,
            b'0'..=b'9' => b - b'0',
            b'a'..=b'f' => b - b'a' + 10,
            b'A'..=b'F' => b - b'A' + 10,
            b if b.is_ascii_whitespace() => continue,
            other => return Err(format!("ASCIIHexDecode: invalid byte {other:#04x}")),
        };
        nibbles.push(nibble);
    }
    if nibbles.len() % 2 == 1 {
        nibbles.push(0);
    }
    Ok(nibbles.chunks_exact(2).map(|p| (p[0] << 4) | p[1]).collect())
}

fn ascii85_decode(data: &[u8]) -> Result<Vec<u8>, String> {
    let body = data.strip_prefix(b"<~").unwrap_or(data);
    let mut out = Vec::with_capacity(body.len() * 4 / 5);
    let mut group = [0u8; 5];
    let mut filled = 0;
    for &b in body {
        match b {
            b'~' => break,
            b'z' if filled == 0 => out.extend_from_slice(&[0; 4]),
            b'!'..=b'u' => {
                group[filled] = b - b'!';
                filled += 1;
                if filled == 5 {
                    out.extend_from_slice(&ascii85_word(&group)?);
                    filled = 0;
                }
            }
            b if b.is_ascii_whitespace() => {}
            other => return Err(format!("ASCII85Decode: invalid byte {other:#04x}")),
        }
    }
    match filled {
        0 => {}
        1 => return Err("ASCII85Decode: dangling final character".to_string()),
        n => {
            group[n..].fill(b'u' - b'!');
            out.extend_from_slice(&ascii85_word(&group)?[..n - 1]);
        }
    }
    Ok(out)
}

fn ascii85_word(group: &[u8; 5]) -> Result<[u8; 4], String> {
    let value = group.iter().fold(0u64, |acc, &d| acc * 85 + u64::from(d));
    u32::try_from(value)
        .map(u32::to_be_bytes)
        .map_err(|_| "ASCII85Decode: group out of range".to_string())
}

fn run_length_decode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * 2);
    let mut i = 0;
    while let Some(&len) = data.get(i) {
        i += 1;
        match len {
            0..=127 => {
                let end = (i + len as usize + 1).min(data.len());
                out.extend_from_slice(&data[i..end]);
                i = end;
            }
            128 => break,
            _ => {
                if let Some(&byte) = data.get(i) {
                    out.extend(std::iter::repeat_n(byte, 257 - len as usize));
                }
                i += 1;
            }
        }
    }
    out
}

// ── lopdf helpers ────────────────────────────────────────────────────────

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        other => other,
    }
}

fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, obj) {
        Object::Dictionary(d) => Some(d),
        _ => None,
    }
}

fn name_of<'a>(dict: &'a Dictionary, key: &[u8]) -> Option<&'a [u8]> {
    match dict.get(key) {
        Ok(Object::Name(n)) => Some(n.as_slice()),
        _ => None,
    }
}

fn int_of(dict: &Dictionary, key: &[u8]) -> Option<u64> {
    dict.get(key)
        .ok()
        .and_then(|o| o.as_i64().ok())
        .and_then(|v| u64::try_from(v).ok())
}

/// `/Filter` as a list of names, outermost first.
fn filter_names(dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter") {
        Ok(Object::Name(n)) => vec![n.clone()],
        Ok(Object::Array(arr)) => arr
            .iter()
            .filter_map(|o| match o {
                Object::Name(n) => Some(n.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}
