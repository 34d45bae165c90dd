use criterion::{Criterion, black_box, criterion_group, criterion_main};
use mython::lexer::{self, Lexer};
use mython::parser;
use mython::runtime::{Closure, StreamContext};

const WORKLOAD: &str = "\
class Money:
  def __init__(amount):
    self.amount = amount
  def __add__(other):
    return self.amount + other.amount
  def __lt__(other):
    return self.amount < other.amount
  def __str__():
    return str(self.amount) + ' coins'
class Money2(Money):
  def noop():
    return 1
a = Money(3)
b = Money(4)
print a + b
print a < b
if a < b: print 'cheaper'
else: print 'pricier'
";

fn bench_interpreter(c: &mut Criterion) {
    c.bench_function("lex_only", |b| {
        b.iter(|| {
            let tokens = lexer::tokenize(black_box(WORKLOAD).as_bytes()).expect("tokenize");
            black_box(tokens);
        })
    });

    c.bench_function("lex_plus_parse", |b| {
        b.iter(|| {
            let mut lexer = Lexer::new(black_box(WORKLOAD).as_bytes()).expect("lexer");
            let program = parser::parse(&mut lexer).expect("parse");
            black_box(program);
        })
    });

    c.bench_function("full_pipeline", |b| {
        b.iter(|| {
            let mut lexer = Lexer::new(black_box(WORKLOAD).as_bytes()).expect("lexer");
            let program = parser::parse(&mut lexer).expect("parse");
            let mut closure = Closure::new();
            let mut ctx = StreamContext::buffered();
            program.eval(&mut closure, &mut ctx).expect("run");
            black_box(ctx.contents());
        })
    });

    c.bench_function("execute_prepared", |b| {
        let mut lexer = Lexer::new(WORKLOAD.as_bytes()).expect("lexer");
        let program = parser::parse(&mut lexer).expect("parse");
        b.iter(|| {
            let mut closure = Closure::new();
            let mut ctx = StreamContext::buffered();
            program.eval(&mut closure, &mut ctx).expect("run");
            black_box(ctx.contents());
        })
    });
}

criterion_group!(benches, bench_interpreter);
criterion_main!(benches);
