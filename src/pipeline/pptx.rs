//! PresentationML packaging: [`DeckLayout`] → `.pptx` bytes.
//!
//! Writes the smallest part set PowerPoint, Keynote and LibreOffice all open
//! without repair: one master, one blank layout, one theme, and one slide
//! part per laid-out slide. Every zip entry gets the same fixed timestamp and
//! parts are written in a fixed order, so the same layout always produces
//! byte-identical output.
//!
//! Elements flagged `reveal` are wired into the slide's main click sequence
//! as "appear" entrance effects, all triggered by the first click.

use crate::config::DeckConfig;
use crate::error::DocDeckError;
use crate::output::RenderedDeck;
use crate::pipeline::layout::{
    self, Align, Anchor, DeckLayout, Element, Geometry, Slide, SLIDE_HEIGHT, SLIDE_WIDTH,
};
use crate::quiz::ExtractionResult;
use std::fmt::Write as _;
use std::io::{Cursor, Write};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const EMU_PER_INCH: f64 = 914_400.0;
const EMU_PER_POINT: f64 = 12_700.0;
const FONT_FACE: &str = "Arial";
const APPLICATION: &str = "edgequake-doc2deck";

const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
const NS_PKG_RELS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// Lay out and package an extraction result.
pub fn render_deck(result: &ExtractionResult, deck: &DeckConfig) -> Result<RenderedDeck, DocDeckError> {
    let laid_out = layout::layout_deck(result, deck);
    let bytes = package(&laid_out)?;
    let rendered = RenderedDeck {
        file_name: layout::deck_file_name(&result.title),
        bytes,
        slide_count: laid_out.slides.len(),
    };
    debug!(
        "Rendered '{}': {} slides, {} bytes",
        rendered.file_name,
        rendered.slide_count,
        rendered.bytes.len()
    );
    Ok(rendered)
}

/// Serialise a laid-out deck into an Office Open XML package.
pub fn package(layout: &DeckLayout) -> Result<Vec<u8>, DocDeckError> {
    let n = layout.slides.len();
    let mut parts: Vec<(String, String)> = vec![
        ("[Content_Types].xml".into(), content_types(n)),
        ("_rels/.rels".into(), root_rels()),
        ("docProps/core.xml".into(), core_props(&layout.title)),
        ("docProps/app.xml".into(), app_props(n)),
        ("ppt/presentation.xml".into(), presentation(n)),
        ("ppt/_rels/presentation.xml.rels".into(), presentation_rels(n)),
        ("ppt/presProps.xml".into(), pres_props()),
        ("ppt/viewProps.xml".into(), view_props()),
        ("ppt/tableStyles.xml".into(), table_styles()),
        ("ppt/theme/theme1.xml".into(), theme()),
        ("ppt/slideMasters/slideMaster1.xml".into(), slide_master()),
        (
            "ppt/slideMasters/_rels/slideMaster1.xml.rels".into(),
            slide_master_rels(),
        ),
        ("ppt/slideLayouts/slideLayout1.xml".into(), slide_layout()),
        (
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels".into(),
            slide_layout_rels(),
        ),
    ];
    for (i, slide) in layout.slides.iter().enumerate() {
        let idx = i + 1;
        parts.push((format!("ppt/slides/slide{idx}.xml"), slide_xml(slide)));
        parts.push((format!("ppt/slides/_rels/slide{idx}.xml.rels"), slide_rels()));
    }

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, xml) in &parts {
        zip.start_file(name.as_str(), options)?;
        zip.write_all(xml.as_bytes())
            .map_err(|e| DocDeckError::RenderFailed(format!("writing {name}: {e}")))?;
    }
    Ok(zip.finish()?.into_inner())
}

// ── Units and escaping ─────────────────────────────────────────────────────

fn emu(inches: f64) -> i64 {
    (inches * EMU_PER_INCH).round() as i64
}

/// XML-escape text, dropping characters XML 1.0 cannot carry.
fn esc(text: &str) -> String {
    let filtered: String = text
        .chars()
        .filter(|&c| !c.is_control() || c == '\t' || c == '\n')
        .collect();
    quick_xml::escape::escape(filtered.as_str()).into_owned()
}

// ── Package parts ──────────────────────────────────────────────────────────

fn content_types(slides: usize) -> String {
    const PML: &str = "application/vnd.openxmlformats-officedocument.presentationml";
    let mut xml = format!(
        r#"{XML_DECL}<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/ppt/presentation.xml" ContentType="{PML}.presentation.main+xml"/><Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="{PML}.slideMaster+xml"/><Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="{PML}.slideLayout+xml"/>"#
    );
    for i in 1..=slides {
        let _ = write!(
            xml,
            r#"<Override PartName="/ppt/slides/slide{i}.xml" ContentType="{PML}.slide+xml"/>"#
        );
    }
    let _ = write!(
        xml,
        r#"<Override PartName="/ppt/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/><Override PartName="/ppt/presProps.xml" ContentType="{PML}.presProps+xml"/><Override PartName="/ppt/viewProps.xml" ContentType="{PML}.viewProps+xml"/><Override PartName="/ppt/tableStyles.xml" ContentType="{PML}.tableStyles+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/><Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/></Types>"#
    );
    xml
}

fn root_rels() -> String {
    format!(
        r#"{XML_DECL}<Relationships xmlns="{NS_PKG_RELS}"><Relationship Id="rId1" Type="{REL_BASE}/officeDocument" Target="ppt/presentation.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/><Relationship Id="rId3" Type="{REL_BASE}/extended-properties" Target="docProps/app.xml"/></Relationships>"#
    )
}

fn core_props(title: &str) -> String {
    format!(
        r#"{XML_DECL}<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:dcmitype="http://purl.org/dc/dcmitype/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><dc:title>{}</dc:title><dc:creator>{APPLICATION}</dc:creator></cp:coreProperties>"#,
        esc(title)
    )
}

fn app_props(slides: usize) -> String {
    format!(
        r#"{XML_DECL}<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties" xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes"><Application>{APPLICATION}</Application><PresentationFormat>On-screen Show (16:9)</PresentationFormat><Slides>{slides}</Slides></Properties>"#
    )
}

/// Relationship ids: rId1 master, rId2..=rId(n+1) slides, then the rest.
fn presentation(slides: usize) -> String {
    let mut ids = String::new();
    for i in 0..slides {
        let _ = write!(ids, r#"<p:sldId id="{}" r:id="rId{}"/>"#, 256 + i, i + 2);
    }
    let sld_id_lst = if ids.is_empty() {
        String::new()
    } else {
        format!("<p:sldIdLst>{ids}</p:sldIdLst>")
    };
    format!(
        r#"{XML_DECL}<p:presentation xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}" saveSubsetFonts="1"><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>{sld_id_lst}<p:sldSz cx="{}" cy="{}"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#,
        emu(SLIDE_WIDTH),
        emu(SLIDE_HEIGHT)
    )
}

fn presentation_rels(slides: usize) -> String {
    let mut xml = format!(
        r#"{XML_DECL}<Relationships xmlns="{NS_PKG_RELS}"><Relationship Id="rId1" Type="{REL_BASE}/slideMaster" Target="slideMasters/slideMaster1.xml"/>"#
    );
    for i in 1..=slides {
        let _ = write!(
            xml,
            r#"<Relationship Id="rId{}" Type="{REL_BASE}/slide" Target="slides/slide{i}.xml"/>"#,
            i + 1
        );
    }
    let next = slides + 2;
    let _ = write!(
        xml,
        r#"<Relationship Id="rId{}" Type="{REL_BASE}/presProps" Target="presProps.xml"/><Relationship Id="rId{}" Type="{REL_BASE}/viewProps" Target="viewProps.xml"/><Relationship Id="rId{}" Type="{REL_BASE}/theme" Target="theme/theme1.xml"/><Relationship Id="rId{}" Type="{REL_BASE}/tableStyles" Target="tableStyles.xml"/></Relationships>"#,
        next,
        next + 1,
        next + 2,
        next + 3
    );
    xml
}

fn pres_props() -> String {
    format!(r#"{XML_DECL}<p:presentationPr xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}"/>"#)
}

fn view_props() -> String {
    format!(
        r#"{XML_DECL}<p:viewPr xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}"><p:normalViewPr><p:restoredLeft sz="15620"/><p:restoredTop sz="94660"/></p:normalViewPr><p:gridSpacing cx="76200" cy="76200"/></p:viewPr>"#
    )
}

fn table_styles() -> String {
    format!(
        r#"{XML_DECL}<a:tblStyleLst xmlns:a="{NS_A}" def="{{5C22544A-7EE6-4342-B048-85BDC9FD1C3A}}"/>"#
    )
}

fn theme() -> String {
    let solid = r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#;
    let fills = solid.repeat(3);
    let lines: String = [6350, 12700, 19050]
        .iter()
        .map(|w| format!(r#"<a:ln w="{w}">{solid}</a:ln>"#))
        .collect();
    let effects = "<a:effectStyle><a:effectLst/></a:effectStyle>".repeat(3);
    let font = format!(
        r#"<a:latin typeface="{FONT_FACE}"/><a:ea typeface=""/><a:cs typeface=""/>"#
    );
    let p = layout::palette::NEON_BLUE.0;
    let q = layout::palette::NEON_PURPLE.0;
    let r = layout::palette::NEON_PINK.0;
    let s = layout::palette::SUCCESS.0;
    let d = layout::palette::DARK_CARD.0;
    let t = layout::palette::SUBTLE_TEXT.0;
    let bg = layout::palette::BACKGROUND.0;
    format!(
        r#"{XML_DECL}<a:theme xmlns:a="{NS_A}" name="Chalkboard"><a:themeElements><a:clrScheme name="Chalkboard"><a:dk1><a:srgbClr val="000000"/></a:dk1><a:lt1><a:srgbClr val="FFFFFF"/></a:lt1><a:dk2><a:srgbClr val="{bg}"/></a:dk2><a:lt2><a:srgbClr val="{t}"/></a:lt2><a:accent1><a:srgbClr val="{p}"/></a:accent1><a:accent2><a:srgbClr val="{q}"/></a:accent2><a:accent3><a:srgbClr val="{r}"/></a:accent3><a:accent4><a:srgbClr val="{s}"/></a:accent4><a:accent5><a:srgbClr val="{d}"/></a:accent5><a:accent6><a:srgbClr val="{t}"/></a:accent6><a:hlink><a:srgbClr val="{p}"/></a:hlink><a:folHlink><a:srgbClr val="{q}"/></a:folHlink></a:clrScheme><a:fontScheme name="Chalkboard"><a:majorFont>{font}</a:majorFont><a:minorFont>{font}</a:minorFont></a:fontScheme><a:fmtScheme name="Chalkboard"><a:fillStyleLst>{fills}</a:fillStyleLst><a:lnStyleLst>{lines}</a:lnStyleLst><a:effectStyleLst>{effects}</a:effectStyleLst><a:bgFillStyleLst>{fills}</a:bgFillStyleLst></a:fmtScheme></a:themeElements><a:objectDefaults/><a:extraClrSchemeLst/></a:theme>"#
    )
}

fn empty_sp_tree() -> &'static str {
    r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#
}

fn slide_master() -> String {
    format!(
        r#"{XML_DECL}<p:sldMaster xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}"><p:cSld><p:bg><p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef></p:bg><p:spTree>{}</p:spTree></p:cSld><p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/><p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst><p:txStyles><p:titleStyle><a:lvl1pPr><a:defRPr sz="4400"/></a:lvl1pPr></p:titleStyle><p:bodyStyle><a:lvl1pPr><a:defRPr sz="1800"/></a:lvl1pPr></p:bodyStyle><p:otherStyle><a:lvl1pPr><a:defRPr sz="1800"/></a:lvl1pPr></p:otherStyle></p:txStyles></p:sldMaster>"#,
        empty_sp_tree()
    )
}

fn slide_master_rels() -> String {
    format!(
        r#"{XML_DECL}<Relationships xmlns="{NS_PKG_RELS}"><Relationship Id="rId1" Type="{REL_BASE}/slideLayout" Target="../slideLayouts/slideLayout1.xml"/><Relationship Id="rId2" Type="{REL_BASE}/theme" Target="../theme/theme1.xml"/></Relationships>"#
    )
}

fn slide_layout() -> String {
    format!(
        r#"{XML_DECL}<p:sldLayout xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}" type="blank" preserve="1"><p:cSld name="Blank"><p:spTree>{}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#,
        empty_sp_tree()
    )
}

fn slide_layout_rels() -> String {
    format!(
        r#"{XML_DECL}<Relationships xmlns="{NS_PKG_RELS}"><Relationship Id="rId1" Type="{REL_BASE}/slideMaster" Target="../slideMasters/slideMaster1.xml"/></Relationships>"#
    )
}

fn slide_rels() -> String {
    format!(
        r#"{XML_DECL}<Relationships xmlns="{NS_PKG_RELS}"><Relationship Id="rId1" Type="{REL_BASE}/slideLayout" Target="../slideLayouts/slideLayout1.xml"/></Relationships>"#
    )
}

// ── Slides ─────────────────────────────────────────────────────────────────

fn slide_xml(slide: &Slide) -> String {
    let mut shapes = String::new();
    let mut revealed = Vec::new();
    for (i, element) in slide.elements.iter().enumerate() {
        // id 1 is the group root.
        let id = i + 2;
        shape_xml(&mut shapes, id, element);
        if element.reveal {
            revealed.push(id);
        }
    }
    format!(
        r#"{XML_DECL}<p:sld xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}"><p:cSld><p:bg><p:bgPr><a:solidFill><a:srgbClr val="{}"/></a:solidFill><a:effectLst/></p:bgPr></p:bg><p:spTree>{}{shapes}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>{}</p:sld>"#,
        slide.background.0,
        empty_sp_tree(),
        timing_xml(&revealed)
    )
}

fn shape_xml(out: &mut String, id: usize, element: &Element) {
    let f = element.frame;
    let (name, tx_box) = match (&element.text, element.fill) {
        (Some(_), None) => ("TextBox", r#" txBox="1""#),
        (Some(_), Some(_)) => ("Label", ""),
        (None, _) => ("Shape", ""),
    };
    let _ = write!(
        out,
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name} {id}"/><p:cNvSpPr{tx_box}/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm>"#,
        emu(f.x),
        emu(f.y),
        emu(f.w),
        emu(f.h)
    );

    match element.geometry {
        Geometry::Rect => out.push_str(r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom>"#),
        Geometry::RoundRect { radius } => {
            let shorter = f.w.min(f.h);
            let adj = if shorter > 0.0 {
                ((radius / shorter) * 100_000.0).round().min(50_000.0) as i64
            } else {
                0
            };
            let _ = write!(
                out,
                r#"<a:prstGeom prst="roundRect"><a:avLst><a:gd name="adj" fmla="val {adj}"/></a:avLst></a:prstGeom>"#
            );
        }
    }

    match element.fill {
        Some(fill) if fill.transparency > 0 => {
            let alpha = (100 - u32::from(fill.transparency.min(100))) * 1000;
            let _ = write!(
                out,
                r#"<a:solidFill><a:srgbClr val="{}"><a:alpha val="{alpha}"/></a:srgbClr></a:solidFill>"#,
                fill.color.0
            );
        }
        Some(fill) => {
            let _ = write!(out, r#"<a:solidFill><a:srgbClr val="{}"/></a:solidFill>"#, fill.color.0);
        }
        None => out.push_str("<a:noFill/>"),
    }

    match element.outline {
        Some(line) => {
            let _ = write!(
                out,
                r#"<a:ln w="{}"><a:solidFill><a:srgbClr val="{}"/></a:solidFill></a:ln>"#,
                (line.width_pt * EMU_PER_POINT).round() as i64,
                line.color.0
            );
        }
        None => out.push_str("<a:ln><a:noFill/></a:ln>"),
    }
    out.push_str("</p:spPr>");

    if let Some(body) = &element.text {
        let anchor = match body.anchor {
            Anchor::Top => "t",
            Anchor::Middle => "ctr",
        };
        let algn = match body.align {
            Align::Left => "l",
            Align::Center => "ctr",
            Align::Right => "r",
        };
        let _ = write!(
            out,
            r#"<p:txBody><a:bodyPr wrap="square" lIns="91440" tIns="45720" rIns="91440" bIns="45720" rtlCol="0" anchor="{anchor}"><a:noAutofit/></a:bodyPr><a:lstStyle/>"#
        );
        for paragraph in paragraphs(&body.runs) {
            let _ = write!(out, r#"<a:p><a:pPr algn="{algn}"/>"#);
            for (run, text) in &paragraph {
                let _ = write!(
                    out,
                    r#"<a:r><a:rPr lang="vi-VN" sz="{}" b="{}" dirty="0"><a:solidFill><a:srgbClr val="{}"/></a:solidFill><a:latin typeface="{FONT_FACE}"/><a:cs typeface="{FONT_FACE}"/></a:rPr><a:t>{}</a:t></a:r>"#,
                    run.size_pt * 100,
                    u8::from(run.bold),
                    run.color.0,
                    esc(text)
                );
            }
            out.push_str("</a:p>");
        }
        out.push_str("</p:txBody>");
    }
    out.push_str("</p:sp>");
}

/// Split runs at embedded newlines into paragraphs of `(run, text)` pieces.
fn paragraphs(runs: &[layout::TextRun]) -> Vec<Vec<(&layout::TextRun, &str)>> {
    let mut paragraphs = vec![Vec::new()];
    for run in runs {
        for (i, piece) in run.text.split('\n').enumerate() {
            if i > 0 {
                paragraphs.push(Vec::new());
            }
            if !piece.is_empty() {
                if let Some(current) = paragraphs.last_mut() {
                    current.push((run, piece));
                }
            }
        }
    }
    paragraphs
}

/// Main click sequence: one click shows every revealed shape at once.
fn timing_xml(shape_ids: &[usize]) -> String {
    if shape_ids.is_empty() {
        return String::new();
    }
    // cTn ids 1 and 2 are the root and the main sequence; the click group
    // takes 3 and 4, then two per effect.
    let mut effects = String::new();
    let mut ctn = 5;
    for (i, spid) in shape_ids.iter().enumerate() {
        let node = if i == 0 { "clickEffect" } else { "withEffect" };
        let _ = write!(
            effects,
            r#"<p:par><p:cTn id="{}" presetID="1" presetClass="entr" presetSubtype="0" fill="hold" grpId="0" nodeType="{node}"><p:stCondLst><p:cond delay="0"/></p:stCondLst><p:childTnLst><p:set><p:cBhvr><p:cTn id="{}" dur="1" fill="hold"><p:stCondLst><p:cond delay="0"/></p:stCondLst></p:cTn><p:tgtEl><p:spTgt spid="{spid}"/></p:tgtEl><p:attrNameLst><p:attrName>style.visibility</p:attrName></p:attrNameLst></p:cBhvr><p:to><p:strVal val="visible"/></p:to></p:set></p:childTnLst></p:cTn></p:par>"#,
            ctn,
            ctn + 1
        );
        ctn += 2;
    }
    let builds: String = shape_ids
        .iter()
        .map(|spid| format!(r#"<p:bldP spid="{spid}" grpId="0" animBg="1"/>"#))
        .collect();
    format!(
        r#"<p:timing><p:tnLst><p:par><p:cTn id="1" dur="indefinite" restart="never" nodeType="tmRoot"><p:childTnLst><p:seq concurrent="1" nextAc="seek"><p:cTn id="2" dur="indefinite" nodeType="mainSeq"><p:childTnLst><p:par><p:cTn id="3" fill="hold"><p:stCondLst><p:cond delay="indefinite"/></p:stCondLst><p:childTnLst><p:par><p:cTn id="4" fill="hold"><p:stCondLst><p:cond delay="0"/></p:stCondLst><p:childTnLst>{effects}</p:childTnLst></p:cTn></p:par></p:childTnLst></p:cTn></p:par></p:childTnLst></p:cTn><p:prevCondLst><p:cond evt="onPrev" delay="0"><p:tgtEl><p:sldTgt/></p:tgtEl></p:cond></p:prevCondLst><p:nextCondLst><p:cond evt="onNext" delay="0"><p:tgtEl><p:sldTgt/></p:tgtEl></p:cond></p:nextCondLst></p:seq></p:childTnLst></p:cTn></p:par></p:tnLst><p:bldLst>{builds}</p:bldLst></p:timing>"#
    )
}
