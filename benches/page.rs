use accessnow::dom::{Display, Document, Element};
use accessnow::settings::{AccessibilitySettings, Theme};
use accessnow::text::{format_as_bullets, generate_answer};
use accessnow::{build_css, extract_page_text};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

fn sample_page(sections: usize) -> Document {
    let body = (0..sections)
        .map(|i| {
            Element::new("section")
                .child(Element::with_text("h2", &format!("Section {i}")))
                .child(Element::with_text(
                    "p",
                    "Accessible pages use clear language. Short sentences help readers! Do they?",
                ))
                .child(Element::with_text("p", "Hidden footnote.").display(Display::None))
        })
        .collect();
    Document::new(body)
}

fn bench_extract(c: &mut Criterion) {
    for &sections in &[10usize, 200] {
        let doc = sample_page(sections);
        c.bench_with_input(BenchmarkId::new("extract_page_text", sections), &doc, |b, doc| {
            b.iter(|| black_box(extract_page_text(doc).len()));
        });
    }
}

fn bench_css(c: &mut Criterion) {
    for theme in Theme::ALL {
        let settings = AccessibilitySettings {
            theme,
            dyslexia_font: true,
            ..AccessibilitySettings::default()
        };
        c.bench_with_input(BenchmarkId::new("build_css", theme), &settings, |b, settings| {
            b.iter(|| black_box(build_css(settings)));
        });
    }
}

fn bench_text(c: &mut Criterion) {
    let text = extract_page_text(&sample_page(200));
    c.bench_function("generate_answer::short_question", |b| {
        b.iter(|| black_box(generate_answer(&text, "why do short sentences help")));
    });
    c.bench_function("format_as_bullets::page", |b| {
        b.iter(|| black_box(format_as_bullets(&text)));
    });
}

criterion_group!(benches, bench_extract, bench_css, bench_text);
criterion_main!(benches);
