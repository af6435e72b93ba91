//! Benchmarks for the translate and render stages.
//!
//! Run with: cargo bench
//!
//! Books are built in memory, so no PDF or translation service is involved.

use std::path::Path;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use transpdf::render::{to_markdown, to_pdf};
use transpdf::{Book, Content, Page, PdfTranslator, RenderOptions, TableGrid, TranslationReply};

/// Delimited table reply with `rows` data rows and four columns.
fn table_reply(rows: usize) -> String {
    let mut reply = String::from("Name | Value | Unit | Note");
    for i in 0..rows {
        reply.push_str(&format!("\nitem {} | {} | mm | row {}", i, i * 3, i));
    }
    reply
}

/// Book with `page_count` pages of one paragraph and one table each.
fn create_test_book(page_count: usize) -> Book {
    let mut book = Book::new("bench.pdf");
    for n in 1..=page_count {
        let mut page = Page::new(n as u32, 612.0, 792.0);
        page.add_content(Content::text(format!(
            "Page {} - Benchmark paragraph with enough words to wrap across several lines of output.",
            n
        )));
        page.add_content(Content::table(vec![vec![
            vec!["Name".into(), "Value".into()],
            vec!["width".into(), n.to_string()],
        ]]));
        book.add_page(page);
    }
    book
}

fn echo(prompt: &str) -> TranslationReply {
    if prompt.contains("table structure") {
        TranslationReply::ok(table_reply(8))
    } else {
        TranslationReply::ok(prompt.rsplit(':').next().unwrap_or_default())
    }
}

/// Benchmark PDF header detection.
fn bench_format_detection(c: &mut Criterion) {
    let pdf_data = b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n1 0 obj\n<< /Type /Catalog >>\nendobj\n";
    let non_pdf_data = b"Not a PDF file at all, just random text content";

    c.bench_function("detect_valid_pdf", |b| {
        b.iter(|| transpdf::pdf_version_from_bytes(black_box(pdf_data)).unwrap());
    });

    c.bench_function("detect_non_pdf", |b| {
        b.iter(|| transpdf::pdf_version_from_bytes(black_box(non_pdf_data)).is_err());
    });
}

/// Benchmark table reconstruction at various sizes.
fn bench_table_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("table_parsing");

    for rows in [4, 32, 256].iter() {
        let reply = table_reply(*rows);
        group.bench_function(format!("{}_rows", rows), |b| {
            b.iter(|| TableGrid::parse_delimited(black_box(&reply)).unwrap());
        });
    }

    group.finish();
}

/// Benchmark a full translate pass with an in-process service.
fn bench_translate_book(c: &mut Criterion) {
    let translator = PdfTranslator::new(echo);

    c.bench_function("translate_book_10_pages", |b| {
        b.iter(|| {
            let mut book = create_test_book(10);
            translator.translate_book(black_box(&mut book), "English")
        });
    });
}

/// Benchmark both writers on a translated book.
fn bench_rendering(c: &mut Criterion) {
    let mut group = c.benchmark_group("rendering");
    let translator = PdfTranslator::new(echo);

    for page_count in [1, 10].iter() {
        let mut book = create_test_book(*page_count);
        translator.translate_book(&mut book, "English");

        group.bench_function(format!("markdown_{}_pages", page_count), |b| {
            b.iter(|| to_markdown(black_box(&book), Path::new("bench_translated.md")));
        });

        let options = RenderOptions::default();
        group.bench_function(format!("pdf_{}_pages", page_count), |b| {
            b.iter(|| to_pdf(black_box(&book), &options).unwrap());
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_format_detection,
    bench_table_parsing,
    bench_translate_book,
    bench_rendering,
);
criterion_main!(benches);
