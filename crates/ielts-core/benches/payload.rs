use criterion::{black_box, criterion_group, criterion_main, Criterion};

use ielts_core::answers::{AnswerKey, AnswerMap};
use ielts_core::model::{Question, QuestionKind, Section, Test, TestKind};
use ielts_core::parser::validate_test;

fn make_test(sections: usize, per_section: usize) -> Test {
    Test {
        id: "bench".into(),
        title: "Bench".into(),
        kind: TestKind::Reading,
        duration: 60,
        description: None,
        sections: (0..sections)
            .map(|s| Section {
                id: format!("s{s}"),
                name: format!("Section {s}"),
                passage: None,
                audio_url: None,
                image_url: None,
                pdf_url: None,
                questions: (0..per_section)
                    .map(|q| Question {
                        id: format!("s{s}q{q}"),
                        question_text: "Prompt".into(),
                        kind: if q % 5 == 0 {
                            QuestionKind::MatchingHeadings
                        } else {
                            QuestionKind::ShortAnswer
                        },
                        options: vec!["i".into(), "ii".into(), "iii".into(), "iv".into()],
                        correct_answer: None,
                        instructions: None,
                    })
                    .collect(),
            })
            .collect(),
    }
}

fn bench_entries_for(c: &mut Criterion) {
    let mut group = c.benchmark_group("entries_for");

    for (sections, per_section) in [(4, 10), (4, 40)] {
        let test = make_test(sections, per_section);
        let mut answers = AnswerMap::new();
        for q in test.questions().step_by(2) {
            answers.set(AnswerKey::question(&q.id), "answer");
        }

        group.bench_function(format!("{}x{}", sections, per_section), |b| {
            b.iter(|| answers.entries_for(black_box(&test)))
        });
    }

    group.finish();
}

fn bench_validate(c: &mut Criterion) {
    let test = make_test(4, 40);
    c.bench_function("validate_test 4x40", |b| {
        b.iter(|| validate_test(black_box(&test)))
    });
}

criterion_group!(benches, bench_entries_for, bench_validate);
criterion_main!(benches);
