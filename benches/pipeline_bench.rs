use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ogshot::extract::extract_metadata;
use ogshot::template::{render_html, CardAssets};
use ogshot::Viewport;

// Roughly the size of a real docs page head plus header
fn sample_page() -> String {
    let mut filler = String::new();
    for i in 0..400 {
        filler.push_str(&format!("<p class=\"prose\">Paragraph {} with <code>px-4</code> utilities.</p>", i));
    }
    format!(
        r#"<!DOCTYPE html><html><head>
<title>Padding - Tailwind CSS</title>
<meta property="og:description" content="Utilities for controlling an element's padding.">
</head><body><header id="header"><div><p>Spacing</p></div><h1>Padding</h1></header>{}</body></html>"#,
        filler
    )
}

fn bench_extract(c: &mut Criterion) {
    let page = sample_page();
    c.bench_function("extract_metadata", |b| {
        b.iter(|| extract_metadata(black_box(&page), "Tailwind CSS").unwrap())
    });
}

fn bench_render(c: &mut Criterion) {
    let page = sample_page();
    let meta = extract_metadata(&page, "Tailwind CSS").unwrap();
    // Similar in size to the real background and font
    let assets = CardAssets::from_bytes(&vec![7u8; 180_000], &vec![9u8; 320_000]);

    c.bench_function("render_html", |b| {
        b.iter(|| render_html(black_box(&meta), &assets, Viewport::default()))
    });
}

criterion_group!(benches, bench_extract, bench_render);
criterion_main!(benches);
