//! Hybrid expressions evaluated through foreign keys.

mod common;

use common::{ids, school, Classroom, School, Student, StudentClassroom, Teacher};
use hybrid_rs_attributes::{HybridExpression, HybridQuerySetExt};
use hybrid_rs_core::HybridError;
use hybrid_rs_db::{DatabaseBackendType, Model, QuerySet, Value, Q};

async fn enrolments(school: &School, qs: QuerySet<StudentClassroom>) -> Vec<Value> {
    let mut found = ids(&qs.execute_query(&school.db).await.unwrap());
    found.sort_by_key(Value::as_int);
    found
}

async fn students(school: &School, qs: QuerySet<Student>) -> Vec<Value> {
    let mut found = ids(&qs.execute_query(&school.db).await.unwrap());
    found.sort_by_key(Value::as_int);
    found
}

fn student_full_name() -> HybridExpression {
    Student::full_name().expr().unwrap().through("student").unwrap()
}

#[tokio::test]
async fn test_property_through_relation() {
    let school = school().await;
    let qs = StudentClassroom::hybrid()
        .filter([student_full_name().eq("Filipe Waitman")])
        .unwrap();
    assert_eq!(
        enrolments(&school, qs).await,
        vec![school.student1_classroom1.clone(), school.student1_classroom2.clone()]
    );

    let sum = Student::magic_number_sum().expr().unwrap().through("student").unwrap();
    let qs = StudentClassroom::hybrid().filter([sum.gt(3)]).unwrap();
    assert_eq!(enrolments(&school, qs).await, vec![school.student2_classroom1.clone()]);
}

#[tokio::test]
async fn test_method_through_relation() {
    let school = school().await;
    let times = Student::magic_number1_times_n()
        .expr(3)
        .unwrap()
        .through("student")
        .unwrap();
    let qs = StudentClassroom::hybrid().filter([times.eq(9)]).unwrap();
    assert_eq!(enrolments(&school, qs).await, vec![school.student2_classroom1.clone()]);

    let status = Student::get_status().expr(()).unwrap().through("student").unwrap();
    let qs = StudentClassroom::hybrid()
        .filter([status.case_insensitive().eq("FAILED")])
        .unwrap();
    assert_eq!(
        enrolments(&school, qs).await,
        vec![school.student1_classroom1.clone(), school.student1_classroom2.clone()]
    );
}

#[tokio::test]
async fn test_case_expression_through_relation() {
    let school = school().await;
    let technology = Classroom::is_about_technology()
        .expr()
        .unwrap()
        .through("classroom")
        .unwrap();
    let qs = StudentClassroom::hybrid().filter([technology.eq(true)]).unwrap();
    assert_eq!(enrolments(&school, qs).await, vec![school.student1_classroom2.clone()]);
}

#[tokio::test]
async fn test_two_hop_relation() {
    let school = school().await;
    let teacher = Teacher::full_name()
        .expr()
        .unwrap()
        .through("classroom__teacher")
        .unwrap();
    let qs = StudentClassroom::hybrid()
        .filter([teacher.clone().with_lookup("iendswith").eq("SECOND")])
        .unwrap();
    assert_eq!(enrolments(&school, qs).await, vec![school.student1_classroom2.clone()]);

    let qs = StudentClassroom::hybrid()
        .filter([(!teacher).eq("Teacher Second")])
        .unwrap();
    assert_eq!(
        enrolments(&school, qs).await,
        vec![school.student1_classroom1.clone(), school.student2_classroom1.clone()]
    );
}

#[tokio::test]
async fn test_own_attributes_alongside_related_ones() {
    let school = school().await;
    let percent = StudentClassroom::get_grade_as_percent().expr(()).unwrap();
    let qs = StudentClassroom::hybrid().filter([percent.gt(0.6)]).unwrap();
    assert_eq!(
        enrolments(&school, qs).await,
        vec![school.student1_classroom2.clone(), school.student2_classroom1.clone()]
    );

    let passed = StudentClassroom::passed().expr().unwrap();
    let qs = StudentClassroom::hybrid()
        .filter([passed.eq(true), student_full_name().eq("Filipe Waitman")])
        .unwrap();
    assert_eq!(enrolments(&school, qs).await, vec![school.student1_classroom2.clone()]);
}

#[tokio::test]
async fn test_direct_model_manager() {
    let school = school().await;
    let qs = Teacher::hybrid()
        .filter([Teacher::full_name().expr().unwrap().eq("Teacher First")])
        .unwrap();
    let teachers = qs.execute_query(&school.db).await.unwrap();
    assert_eq!(ids(&teachers), vec![school.teacher1.clone()]);
    assert_eq!(teachers[0].last_name, "First");
}

#[tokio::test]
async fn test_through_replaces_previous_path() {
    let school = school().await;
    let expr = Student::full_name()
        .expr()
        .unwrap()
        .through("classroom")
        .unwrap()
        .through("student")
        .unwrap();
    assert_eq!(expr.path_prefix(), "student__");
    let qs = StudentClassroom::hybrid().filter([expr.eq("Agent Smith")]).unwrap();
    assert_eq!(enrolments(&school, qs).await, vec![school.student2_classroom1.clone()]);
}

#[tokio::test]
async fn test_through_validation() {
    let err = Student::full_name().expr().unwrap().through("student__").unwrap_err();
    assert!(err.is_usage_error());

    let err = StudentClassroom::hybrid()
        .filter([Student::full_name().expr().unwrap().through("pupil").unwrap().eq("x")])
        .unwrap()
        .to_sql(DatabaseBackendType::SQLite)
        .unwrap_err();
    assert!(matches!(err, HybridError::FieldError(ref msg) if msg.contains("pupil")));
}

// ── Reverse relations ────────────────────────────────────────────────

#[tokio::test]
async fn test_property_through_reverse_relation() {
    let school = school().await;
    let passed = StudentClassroom::passed()
        .expr()
        .unwrap()
        .through("studentclassroom")
        .unwrap();

    let qs = Student::objects().all().hybrid_filter([passed.eq(false)]).unwrap();
    assert_eq!(qs.count_exec(&school.db).await.unwrap(), 1);
    assert_eq!(students(&school, qs).await, vec![school.student1.clone()]);

    let qs = Student::objects().all().hybrid_filter([passed.eq(true)]).unwrap();
    assert_eq!(qs.count_exec(&school.db).await.unwrap(), 2);
    assert_eq!(
        students(&school, qs).await,
        vec![school.student1.clone(), school.student2.clone()]
    );
}

#[tokio::test]
async fn test_reverse_then_forward_relation() {
    let school = school().await;
    let technology = Classroom::is_about_technology()
        .expr()
        .unwrap()
        .through("studentclassroom__classroom")
        .unwrap();
    let qs = Student::objects().all().hybrid_filter([technology.eq(true)]).unwrap();
    assert_eq!(students(&school, qs).await, vec![school.student1.clone()]);
}

#[tokio::test]
async fn test_method_through_reverse_relation_with_distinct() {
    let school = school().await;
    let percent = StudentClassroom::get_grade_as_percent()
        .expr(())
        .unwrap()
        .through("studentclassroom")
        .unwrap();
    let qs = Student::objects()
        .all()
        .hybrid_filter([percent.lt(0.7)])
        .unwrap()
        .distinct();
    assert!(qs.to_sql(DatabaseBackendType::SQLite).unwrap().0.starts_with("SELECT DISTINCT"));
    assert_eq!(qs.count_exec(&school.db).await.unwrap(), 1);
    assert_eq!(students(&school, qs).await, vec![school.student1.clone()]);
}

#[tokio::test]
async fn test_reverse_relation_repeats_parents_until_distinct() {
    let school = school().await;
    let qs = Student::objects().filter(Q::kwarg("studentclassroom__grade__gte", 5));
    assert_eq!(qs.count_exec(&school.db).await.unwrap(), 3);
    let qs = qs.distinct();
    assert_eq!(qs.count_exec(&school.db).await.unwrap(), 2);
    assert_eq!(
        students(&school, qs).await,
        vec![school.student1.clone(), school.student2.clone()]
    );
}
