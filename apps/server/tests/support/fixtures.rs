use serde_json::{json, Value};

pub const REFERRAL_SLIPS: &str = "referral-slips";
pub const PRESCRIPTIONS: &str = "prescriptions";
pub const HEALTH_EXAMINATIONS: &str = "health-examinations";
pub const PERSONNEL_HEALTH_CARDS: &str = "personnel-health-cards";
pub const SCHOOL_HEALTH_SURVEYS: &str = "school-health-surveys";
pub const ANNUAL_REPORTS: &str = "annual-accomplishment-reports";

pub fn referral_slip(patient_name: &str, date: &str) -> Value {
    json!({
        "referralSlip": {
            "date": date,
            "patientName": patient_name,
            "age": 10,
            "gender": "Male",
            "address": "Brgy. San Isidro, Quezon City",
            "gradeAndSection": "Grade 5 - Sampaguita",
            "reasonForReferral": "Persistent cough for two weeks",
            "referredBy": "Dr. Jose Rizal",
            "referredTo": "Quezon City General Hospital"
        }
    })
}

pub fn prescription(patient_name: &str, date: &str) -> Value {
    json!({
        "patientName": patient_name,
        "age": 9,
        "gender": "Female",
        "address": "Brgy. Malanday, Marikina",
        "date": date,
        "medications": [
            {
                "name": "Amoxicillin",
                "dosage": "250mg",
                "frequency": "3x a day",
                "duration": "7 days",
                "quantity": 21
            },
            { "name": "Paracetamol", "dosage": "250mg", "frequency": "as needed" }
        ],
        "notes": "Take after meals. Return if fever persists beyond three days.",
        "prescribedBy": "Dr. Jose Rizal",
        "licenseNumber": "0123456"
    })
}

pub fn health_examination(learner_name: &str, school_year: &str, date: &str) -> Value {
    json!({
        "learnerName": learner_name,
        "lrn": "136542100012",
        "gender": "Male",
        "age": 11,
        "gradeLevel": "Grade 5",
        "section": "Sampaguita",
        "schoolName": "San Isidro Elementary School",
        "schoolYear": school_year,
        "examinationDate": date,
        "vitalSigns": {
            "heightCm": 140.0,
            "weightKg": 35.0,
            "temperatureC": 36.6,
            "bloodPressure": "100/70",
            "pulseRate": 82
        }
    })
}

pub fn school_health_survey(school_name: &str) -> Value {
    json!({
        "schoolName": school_name,
        "district": "District II",
        "schoolYear": "2023-2024",
        "dateConducted": "2024-02-14",
        "enrollment": { "male": 410, "female": 395 },
        "personnel": { "male": 8, "female": 27 },
        "facilities": { "classrooms": 24, "hasClinic": true }
    })
}

pub fn personnel_health_card(employee_name: &str) -> Value {
    json!({
        "employeeName": employee_name,
        "gender": "Female",
        "dateOfBirth": "1985-04-12",
        "position": "Teacher III",
        "school": "San Isidro Elementary School",
        "dateExamined": "2024-02-05",
        "socialHistory": { "smoker": false, "alcoholDrinker": true, "alcoholFrequency": "occasionally" },
        "medicalHistory": ["Hypertension"],
        "immunizations": [{ "vaccine": "Tetanus toxoid", "dateGiven": "2023-07-10" }]
    })
}

pub fn annual_report(title: &str) -> Value {
    json!({
        "title": title,
        "schoolYear": "2023-2024",
        "reportingPeriod": { "startDate": "2023-06-01", "endDate": "2024-03-31" },
        "healthServices": {
            "learnersExamined": { "male": 120, "female": 131 },
            "referralsIssued": 14,
            "referralsCompleted": 11,
            "prescriptionsIssued": 37
        },
        "preparedBy": "Dr. Jose Rizal"
    })
}
