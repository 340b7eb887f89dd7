//! School models with hybrid attributes, shared by the integration tests.
//!
//! The `wrong_*` attributes disagree with themselves on purpose so the
//! consistency checker has something to catch.

#![allow(dead_code, clippy::cast_precision_loss)]

use hybrid_rs_attributes::{HybridManager, HybridMethod, HybridProperty};
use hybrid_rs_core::HybridError;
use hybrid_rs_db::query::expressions::functions::{concat, lower};
use hybrid_rs_db::{
    create_model, DbExecutor, Expression, FieldDef, FieldType, Model, ModelMeta, OnDelete, Row,
    Value, When, Q,
};
use hybrid_rs_db_backends::SqliteBackend;
use std::sync::LazyLock;

fn full_name_expr(through: &str) -> Expression {
    concat(vec![
        Expression::f(format!("{through}first_name")),
        Expression::value(" "),
        Expression::f(format!("{through}last_name")),
    ])
}

fn id_of(row: &Row) -> Result<Value, HybridError> {
    row.get("id")
}

// ── Teacher ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Teacher {
    pub id: Value,
    pub first_name: String,
    pub last_name: String,
}

impl Teacher {
    pub fn new(first_name: &str, last_name: &str) -> Self {
        Self {
            id: Value::Null,
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    pub fn full_name() -> &'static HybridProperty<Self, String> {
        static ATTR: LazyLock<HybridProperty<Teacher, String>> = LazyLock::new(|| {
            HybridProperty::new("full_name", |t: &Teacher| {
                format!("{} {}", t.first_name, t.last_name)
            })
            .expression(full_name_expr)
        });
        &ATTR
    }

    pub fn hybrid() -> HybridManager<Self> {
        HybridManager::new()
    }
}

impl Model for Teacher {
    fn meta() -> &'static ModelMeta {
        static META: LazyLock<ModelMeta> = LazyLock::new(|| {
            ModelMeta::new(
                "tests",
                "teacher",
                vec![
                    FieldDef::new("id", FieldType::BigAutoField).primary_key(),
                    FieldDef::new("first_name", FieldType::CharField).max_length(63),
                    FieldDef::new("last_name", FieldType::CharField).max_length(63),
                ],
            )
        });
        &META
    }

    fn pk(&self) -> Option<&Value> {
        (!self.id.is_null()).then_some(&self.id)
    }

    fn field_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("first_name", Value::from(self.first_name.as_str())),
            ("last_name", Value::from(self.last_name.as_str())),
        ]
    }

    fn from_row(row: &Row) -> Result<Self, HybridError> {
        Ok(Self {
            id: id_of(row)?,
            first_name: row.get("first_name")?,
            last_name: row.get("last_name")?,
        })
    }
}

// ── Classroom ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Classroom {
    pub id: Value,
    pub name: String,
    pub teacher_id: i64,
}

impl Classroom {
    pub fn new(name: &str, teacher: &Value) -> Self {
        Self {
            id: Value::Null,
            name: name.into(),
            teacher_id: teacher.as_int().unwrap_or_default(),
        }
    }

    pub fn is_about_technology() -> &'static HybridProperty<Self, bool> {
        static ATTR: LazyLock<HybridProperty<Classroom, bool>> = LazyLock::new(|| {
            HybridProperty::new("is_about_technology", |c: &Classroom| c.name.contains("IT"))
                .expression(|through: &str| {
                    Expression::case(
                        vec![When::new(
                            Q::kwarg(&format!("{through}name__contains"), "IT"),
                            Expression::value(true),
                        )],
                        Some(Expression::value(false)),
                    )
                })
        });
        &ATTR
    }
}

impl Model for Classroom {
    fn meta() -> &'static ModelMeta {
        static META: LazyLock<ModelMeta> = LazyLock::new(|| {
            ModelMeta::new(
                "tests",
                "classroom",
                vec![
                    FieldDef::new("id", FieldType::BigAutoField).primary_key(),
                    FieldDef::new("name", FieldType::CharField).max_length(63),
                    FieldDef::foreign_key("teacher", Teacher::meta, OnDelete::Cascade),
                ],
            )
        });
        &META
    }

    fn pk(&self) -> Option<&Value> {
        (!self.id.is_null()).then_some(&self.id)
    }

    fn field_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("name", Value::from(self.name.as_str())),
            ("teacher", Value::from(self.teacher_id)),
        ]
    }

    fn from_row(row: &Row) -> Result<Self, HybridError> {
        Ok(Self {
            id: id_of(row)?,
            name: row.get("name")?,
            teacher_id: row.get("teacher_id")?,
        })
    }
}

// ── Student ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Student {
    pub id: Value,
    pub magic_number1: i64,
    pub magic_number2: i64,
    pub first_name: String,
    pub last_name: String,
}

type StudentMethod<A, T> = HybridMethod<Student, A, T>;

impl Student {
    pub fn new(magic_number1: i64, magic_number2: i64, first_name: &str, last_name: &str) -> Self {
        Self {
            id: Value::Null,
            magic_number1,
            magic_number2,
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    pub fn magic_number1_times_n() -> &'static StudentMethod<i64, i64> {
        static ATTR: LazyLock<StudentMethod<i64, i64>> = LazyLock::new(|| {
            HybridMethod::new("magic_number1_times_n", |s: &Student, n: &i64| s.magic_number1 * n)
                .expression(|through: &str, n: &i64| {
                    Expression::f(format!("{through}magic_number1")) * Expression::value(*n)
                })
        });
        &ATTR
    }

    pub fn magic_number2_times_n() -> &'static StudentMethod<i64, i64> {
        static ATTR: LazyLock<StudentMethod<i64, i64>> = LazyLock::new(|| {
            HybridMethod::new("magic_number2_times_n", |s: &Student, n: &i64| s.magic_number2 * n)
                .expression(|through: &str, n: &i64| {
                    Expression::f(format!("{through}magic_number2")) * Expression::value(*n)
                })
        });
        &ATTR
    }

    pub fn magic_number_sum() -> &'static HybridProperty<Self, i64> {
        static ATTR: LazyLock<HybridProperty<Student, i64>> = LazyLock::new(|| {
            HybridProperty::new("magic_number_sum", |s: &Student| s.magic_number1 + s.magic_number2)
                .expression(|through: &str| {
                    Expression::f(format!("{through}magic_number1"))
                        + Expression::f(format!("{through}magic_number2"))
                })
        });
        &ATTR
    }

    pub fn full_name() -> &'static HybridProperty<Self, String> {
        static ATTR: LazyLock<HybridProperty<Student, String>> = LazyLock::new(|| {
            HybridProperty::new("full_name", |s: &Student| {
                format!("{} {}", s.first_name, s.last_name)
            })
            .with_setter(|s: &mut Student, value: String| {
                let (first, last) = value.split_once(' ').unwrap_or((value.as_str(), ""));
                s.first_name = first.to_string();
                s.last_name = last.to_string();
            })
            .with_deleter(|s: &mut Student| {
                s.first_name.clear();
                s.last_name.clear();
            })
            .expression(full_name_expr)
        });
        &ATTR
    }

    pub fn full_name_lowercased() -> &'static HybridProperty<Self, String> {
        static ATTR: LazyLock<HybridProperty<Student, String>> = LazyLock::new(|| {
            HybridProperty::new("full_name_lowercased", |s: &Student| {
                Student::full_name().value(s).to_lowercase()
            })
            .expression(|through: &str| lower(full_name_expr(through)))
        });
        &ATTR
    }

    /// `passed` once the first magic number reaches 3.
    pub fn get_status() -> &'static StudentMethod<(), String> {
        static ATTR: LazyLock<StudentMethod<(), String>> = LazyLock::new(|| {
            HybridMethod::new("get_status", |s: &Student, _: &()| {
                let status = if s.magic_number1 >= 3 { "passed" } else { "failed" };
                status.to_string()
            })
            .expression(|through: &str, _: &()| {
                Expression::case(
                    vec![When::new(
                        Q::kwarg(&format!("{through}magic_number1__gte"), 3),
                        Expression::value("passed"),
                    )],
                    Some(Expression::value("failed")),
                )
            })
        });
        &ATTR
    }

    pub fn wrong_full_name() -> &'static HybridProperty<Self, String> {
        static ATTR: LazyLock<HybridProperty<Student, String>> = LazyLock::new(|| {
            HybridProperty::new("wrong_full_name", |s: &Student| {
                format!("{} {}", s.first_name, s.last_name)
            })
            .expression(|through: &str| {
                concat(vec![
                    Expression::f(format!("{through}first_name")),
                    Expression::value(" WRONG "),
                    Expression::f(format!("{through}last_name")),
                ])
            })
        });
        &ATTR
    }

    pub fn wrong_magic_number1_times_n() -> &'static StudentMethod<i64, i64> {
        static ATTR: LazyLock<StudentMethod<i64, i64>> = LazyLock::new(|| {
            HybridMethod::new("wrong_magic_number1_times_n", |s: &Student, n: &i64| {
                s.magic_number1 * n
            })
            .expression(|through: &str, n: &i64| {
                Expression::f(format!("{through}magic_number1")) * Expression::value(n + 1)
            })
        });
        &ATTR
    }
}

impl Model for Student {
    fn meta() -> &'static ModelMeta {
        static META: LazyLock<ModelMeta> = LazyLock::new(|| {
            ModelMeta::new(
                "tests",
                "student",
                vec![
                    FieldDef::new("id", FieldType::BigAutoField).primary_key(),
                    FieldDef::new("magic_number1", FieldType::IntegerField),
                    FieldDef::new("magic_number2", FieldType::IntegerField),
                    FieldDef::new("first_name", FieldType::CharField).max_length(63),
                    FieldDef::new("last_name", FieldType::CharField).max_length(63),
                ],
            )
            .reverse_relation("studentclassroom", StudentClassroom::meta, "student")
        });
        &META
    }

    fn pk(&self) -> Option<&Value> {
        (!self.id.is_null()).then_some(&self.id)
    }

    fn field_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("magic_number1", Value::from(self.magic_number1)),
            ("magic_number2", Value::from(self.magic_number2)),
            ("first_name", Value::from(self.first_name.as_str())),
            ("last_name", Value::from(self.last_name.as_str())),
        ]
    }

    fn from_row(row: &Row) -> Result<Self, HybridError> {
        Ok(Self {
            id: id_of(row)?,
            magic_number1: row.get("magic_number1")?,
            magic_number2: row.get("magic_number2")?,
            first_name: row.get("first_name")?,
            last_name: row.get("last_name")?,
        })
    }
}

// ── StudentClassroom ─────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct StudentClassroom {
    pub id: Value,
    pub student_id: i64,
    pub classroom_id: i64,
    pub grade: i64,
}

impl StudentClassroom {
    pub fn new(student: &Value, classroom: &Value, grade: i64) -> Self {
        Self {
            id: Value::Null,
            student_id: student.as_int().unwrap_or_default(),
            classroom_id: classroom.as_int().unwrap_or_default(),
            grade,
        }
    }

    pub fn passed() -> &'static HybridProperty<Self, bool> {
        static ATTR: LazyLock<HybridProperty<StudentClassroom, bool>> = LazyLock::new(|| {
            HybridProperty::new("passed", |sc: &StudentClassroom| sc.grade >= 7).expression(
                |through: &str| {
                    Expression::case(
                        vec![When::new(
                            Q::kwarg(&format!("{through}grade__gte"), 7),
                            Expression::value(true),
                        )],
                        Some(Expression::value(false)),
                    )
                },
            )
        });
        &ATTR
    }

    pub fn get_grade_as_percent() -> &'static HybridMethod<Self, (), f64> {
        static ATTR: LazyLock<HybridMethod<StudentClassroom, (), f64>> = LazyLock::new(|| {
            HybridMethod::new("get_grade_as_percent", |sc: &StudentClassroom, _: &()| {
                sc.grade as f64 / 10.0
            })
            .expression(|through: &str, _: &()| {
                Expression::f(format!("{through}grade")) / Expression::value(10.0)
            })
        });
        &ATTR
    }

    pub fn hybrid() -> HybridManager<Self> {
        HybridManager::new()
    }
}

impl Model for StudentClassroom {
    fn meta() -> &'static ModelMeta {
        static META: LazyLock<ModelMeta> = LazyLock::new(|| {
            ModelMeta::new(
                "tests",
                "studentclassroom",
                vec![
                    FieldDef::new("id", FieldType::BigAutoField).primary_key(),
                    FieldDef::foreign_key("student", Student::meta, OnDelete::Cascade),
                    FieldDef::foreign_key("classroom", Classroom::meta, OnDelete::Cascade),
                    FieldDef::new("grade", FieldType::PositiveSmallIntegerField),
                ],
            )
        });
        &META
    }

    fn pk(&self) -> Option<&Value> {
        (!self.id.is_null()).then_some(&self.id)
    }

    fn field_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("student", Value::from(self.student_id)),
            ("classroom", Value::from(self.classroom_id)),
            ("grade", Value::from(self.grade)),
        ]
    }

    fn from_row(row: &Row) -> Result<Self, HybridError> {
        Ok(Self {
            id: id_of(row)?,
            student_id: row.get("student_id")?,
            classroom_id: row.get("classroom_id")?,
            grade: row.get("grade")?,
        })
    }
}

// ── Fixture data ─────────────────────────────────────────────────────

/// The rows every test starts from.
pub struct School {
    pub db: SqliteBackend,
    pub teacher1: Value,
    pub teacher2: Value,
    pub classroom1: Value,
    pub classroom2: Value,
    pub student1: Value,
    pub student2: Value,
    pub student1_classroom1: Value,
    pub student1_classroom2: Value,
    pub student2_classroom1: Value,
}

/// Creates the tables only.
pub async fn empty_school() -> SqliteBackend {
    let db = SqliteBackend::memory().unwrap();
    for meta in [
        Teacher::meta(),
        Classroom::meta(),
        Student::meta(),
        StudentClassroom::meta(),
    ] {
        db.execute_sql(&meta.create_table_sql(), &[]).await.unwrap();
    }
    db
}

/// Two teachers, two classrooms, two students and three enrolments.
pub async fn school() -> School {
    let db = empty_school().await;

    let teacher1 = create_model(&Teacher::new("Teacher", "First"), &db).await.unwrap();
    let teacher2 = create_model(&Teacher::new("Teacher", "Second"), &db).await.unwrap();
    let classroom1 = create_model(&Classroom::new("Boring stuff", &teacher1), &db).await.unwrap();
    let classroom2 = create_model(&Classroom::new("IT and software development", &teacher2), &db)
        .await
        .unwrap();
    let student1 = create_model(&Student::new(1, 2, "Filipe", "Waitman"), &db).await.unwrap();
    let student2 = create_model(&Student::new(3, 4, "Agent", "Smith"), &db).await.unwrap();
    let student1_classroom1 = create_model(&StudentClassroom::new(&student1, &classroom1, 5), &db)
        .await
        .unwrap();
    let student1_classroom2 = create_model(&StudentClassroom::new(&student1, &classroom2, 7), &db)
        .await
        .unwrap();
    let student2_classroom1 = create_model(&StudentClassroom::new(&student2, &classroom1, 9), &db)
        .await
        .unwrap();

    School {
        db,
        teacher1,
        teacher2,
        classroom1,
        classroom2,
        student1,
        student2,
        student1_classroom1,
        student1_classroom2,
        student2_classroom1,
    }
}

/// The primary keys of `models`, in order.
pub fn ids<M: Model>(models: &[M]) -> Vec<Value> {
    models.iter().filter_map(|m| m.pk().cloned()).collect()
}
