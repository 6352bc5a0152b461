//! Benchmarks for the load → transform → write pipeline.
//!
//! Documents are generated in memory so the numbers do not depend on sample files.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

use pdfh::page_tree::{self, FlatPage};
use pdfh::transform::{self, Grouping, PageSelection, Rotation};
use pdfh::writer::{write_to_vec, WriterConfig};
use pdfh::{Dictionary, Document, Object, Stream};

/// Serialized document with `pages` pages sharing one font resource.
fn generate_pdf(pages: usize) -> Vec<u8> {
    let mut doc = Document::new();

    let mut font = Dictionary::new();
    font.insert("Type".to_string(), Object::name("Font"));
    font.insert("Subtype".to_string(), Object::name("Type1"));
    font.insert("BaseFont".to_string(), Object::name("Helvetica"));
    let font = doc.objects.add(Object::Dictionary(font));

    let mut list = Vec::with_capacity(pages);
    for i in 0..pages {
        let text = format!("BT /F1 12 Tf 72 720 Td (Page {}) Tj ET\n", i + 1).repeat(20);
        let content = doc
            .objects
            .add(Object::Stream(Stream::new(Dictionary::new(), text.into_bytes())));

        let mut fonts = Dictionary::new();
        fonts.insert("F1".to_string(), Object::Reference(font));
        let mut resources = Dictionary::new();
        resources.insert("Font".to_string(), Object::Dictionary(fonts));

        let mut page = Dictionary::new();
        page.insert("Type".to_string(), Object::name("Page"));
        page.insert("Contents".to_string(), Object::Reference(content));
        page.insert("Resources".to_string(), Object::Dictionary(resources));
        list.push(FlatPage {
            reference: doc.objects.add(Object::Dictionary(page)),
            inherited: Default::default(),
        });
    }
    page_tree::rebuild(&mut doc, &list).unwrap();
    write_to_vec(&doc, &WriterConfig::default()).unwrap()
}

fn bench_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("load");
    for pages in [10, 100, 1000] {
        let bytes = generate_pdf(pages);
        group.bench_with_input(BenchmarkId::from_parameter(pages), &bytes, |b, bytes| {
            b.iter(|| Document::from_bytes(black_box(bytes)).unwrap())
        });
    }
    group.finish();
}

fn bench_transforms(c: &mut Criterion) {
    let doc = Document::from_bytes(&generate_pdf(200)).unwrap();
    let odd = PageSelection::Every(2);

    c.bench_function("reverse_200", |b| {
        b.iter(|| transform::reverse(black_box(doc.clone())).unwrap())
    });
    c.bench_function("rotate_200", |b| {
        let rotation = Rotation::from_degrees(90).unwrap();
        b.iter(|| transform::rotate(black_box(doc.clone()), rotation, &PageSelection::All).unwrap())
    });
    c.bench_function("delete_every_2nd_200", |b| {
        b.iter(|| transform::delete(black_box(doc.clone()), &odd, false).unwrap())
    });
    c.bench_function("dupe_200_x3", |b| {
        b.iter(|| transform::dupe(black_box(doc.clone()), 3).unwrap())
    });
    c.bench_function("split_200_by_10", |b| {
        b.iter(|| transform::split(black_box(&doc), &Grouping::Chunks(10)).unwrap())
    });
}

fn bench_write(c: &mut Criterion) {
    let doc = Document::from_bytes(&generate_pdf(200)).unwrap();
    let mut group = c.benchmark_group("write_200");
    for (name, config) in [
        ("plain", WriterConfig::default()),
        ("compressed", WriterConfig::default().with_compress(true)),
        ("xref_stream", WriterConfig::default().with_xref_stream(true)),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| write_to_vec(black_box(&doc), &config).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_load, bench_transforms, bench_write);
criterion_main!(benches);
