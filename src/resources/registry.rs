use super::{ChildDef, FieldDef, FieldKind, ResourceDef};
use crate::types::{ROLE_ADMIN, ROLE_STAFF, ROLE_SUPER_ADMIN};

use FieldKind::{Boolean, Date, Decimal, Enum, Integer, Json, Text, Timestamp};

const TENANT_ID: FieldDef = FieldDef::new("tenantId", "tenant_id", Integer).references("Tenant");
const APP_ID: FieldDef = FieldDef::new("appId", "app_id", Integer).references("App");
const ORG_ID: FieldDef = FieldDef::new("orgId", "org_id", Integer).references("Organization");
const NAME: FieldDef = FieldDef::new("name", "name", Text(Some(255))).required();
const DESCRIPTION: FieldDef = FieldDef::new("description", "description", Text(None));
const NOTES: FieldDef = FieldDef::new("notes", "notes", Text(None));
const IS_ACTIVE: FieldDef = FieldDef::new("isActive", "is_active", Boolean);
const SORT_ORDER: FieldDef = FieldDef::new("sortOrder", "sort_order", Integer);
const APPLICATION_ID: FieldDef = FieldDef::new("applicationId", "application_id", Integer).references("Application");
const ACADEMIC_YEAR_ID: FieldDef = FieldDef::new("academicYearId", "academic_year_id", Integer).references("AcademicYear");
const CLASS_SECTION_ID: FieldDef = FieldDef::new("classSectionId", "class_section_id", Integer).references("ClassSection");
const USER_ID: FieldDef = FieldDef::new("userId", "user_id", Integer).references("User");
const ELEMENT_TYPE_ID: FieldDef = FieldDef::new("elementTypeId", "element_type_id", Integer).references("ElementType");
const ELEMENT_TYPE_PROPERTY_ID: FieldDef =
    FieldDef::new("elementTypePropertyId", "element_type_property_id", Integer).references("ElementTypeProperty");
const PROPERTY_VALUE: FieldDef = FieldDef::new("value", "value", Text(None));

pub const TOKEN_SOURCES: &[&str] = &["google", "passport", "local"];
pub const LEAVE_STATUSES: &[&str] = &["pending", "approved", "rejected", "cancelled"];

pub static TENANT: ResourceDef = ResourceDef {
    name: "Tenant",
    table: "tenants",
    fields: &[
        NAME,
        FieldDef::new("code", "code", Text(Some(50))),
        FieldDef::new("contactEmail", "contact_email", Text(Some(255))),
        FieldDef::new("phone", "phone", Text(Some(50))),
        FieldDef::new("address", "address", Text(None)),
        IS_ACTIVE,
    ],
    date_field: None,
    children: &[],
    write_role: Some(ROLE_SUPER_ADMIN),
};

pub static APP: ResourceDef = ResourceDef {
    name: "App",
    table: "apps",
    fields: &[TENANT_ID.required(), NAME, DESCRIPTION, IS_ACTIVE],
    date_field: None,
    children: &[],
    write_role: Some(ROLE_ADMIN),
};

pub static ORGANIZATION: ResourceDef = ResourceDef {
    name: "Organization",
    table: "organizations",
    fields: &[
        TENANT_ID.required(),
        APP_ID.required(),
        NAME,
        FieldDef::new("address", "address", Text(None)),
        FieldDef::new("phone", "phone", Text(Some(50))),
        FieldDef::new("email", "email", Text(Some(255))),
        IS_ACTIVE,
    ],
    date_field: None,
    children: &[],
    write_role: Some(ROLE_ADMIN),
};

pub static ROLE: ResourceDef = ResourceDef {
    name: "Role",
    table: "roles",
    fields: &[
        TENANT_ID.required(),
        APP_ID,
        FieldDef::new("roleName", "role_name", Text(Some(100))).required(),
        DESCRIPTION,
    ],
    date_field: None,
    children: &[],
    write_role: Some(ROLE_ADMIN),
};

pub static USER: ResourceDef = ResourceDef {
    name: "User",
    table: "users",
    fields: &[
        TENANT_ID,
        APP_ID,
        ORG_ID,
        FieldDef::new("email", "email", Text(Some(255))).required(),
        FieldDef::new("firstName", "first_name", Text(Some(100))),
        FieldDef::new("lastName", "last_name", Text(Some(100))),
        FieldDef::new("displayName", "display_name", Text(Some(255))),
        FieldDef::new("phone", "phone", Text(Some(50))),
        FieldDef::new("photoUrl", "photo_url", Text(None)),
        IS_ACTIVE,
        FieldDef::new("lastLoginAt", "last_login_at", Timestamp),
    ],
    date_field: None,
    children: &[],
    write_role: Some(ROLE_ADMIN),
};

pub static USER_LOGIN: ResourceDef = ResourceDef {
    name: "UserLogin",
    table: "user_logins",
    fields: &[
        USER_ID.required(),
        FieldDef::new("tokenSource", "token_source", Enum(TOKEN_SOURCES)).required(),
        FieldDef::new("externalId", "external_id", Text(Some(255))).required(),
    ],
    date_field: None,
    children: &[],
    write_role: Some(ROLE_ADMIN),
};

pub static USER_ROLE: ResourceDef = ResourceDef {
    name: "UserRole",
    table: "user_roles",
    fields: &[
        TENANT_ID,
        USER_ID.required(),
        FieldDef::new("roleId", "role_id", Integer).references("Role").required(),
    ],
    date_field: None,
    children: &[],
    write_role: Some(ROLE_ADMIN),
};

pub static APPLICATION: ResourceDef = ResourceDef {
    name: "Application",
    table: "applications",
    fields: &[
        TENANT_ID.required(),
        APP_ID,
        ORG_ID.required(),
        USER_ID,
        FieldDef::new("firstName", "first_name", Text(Some(100))).required(),
        FieldDef::new("lastName", "last_name", Text(Some(100))),
        FieldDef::new("dateOfBirth", "date_of_birth", Date),
        FieldDef::new("gender", "gender", Enum(&["male", "female", "other"])),
        FieldDef::new("parentName", "parent_name", Text(Some(255))),
        FieldDef::new("parentEmail", "parent_email", Text(Some(255))),
        FieldDef::new("parentPhone", "parent_phone", Text(Some(50))),
        FieldDef::new("address", "address", Text(None)),
        FieldDef::new("applicationDate", "application_date", Date),
        FieldDef::new("status", "status", Enum(&["pending", "approved", "rejected", "enrolled", "withdrawn"])),
        FieldDef::new("authCode", "auth_code", Text(Some(20))),
        NOTES,
    ],
    date_field: Some("applicationDate"),
    children: &[],
    write_role: None,
};

pub static ACADEMIC_YEAR: ResourceDef = ResourceDef {
    name: "AcademicYear",
    table: "academic_years",
    fields: &[
        TENANT_ID.required(),
        APP_ID,
        ORG_ID.required(),
        FieldDef::new("name", "name", Text(Some(100))).required(),
        FieldDef::new("startDate", "start_date", Date).required(),
        FieldDef::new("endDate", "end_date", Date).required(),
        FieldDef::new("isCurrent", "is_current", Boolean),
    ],
    date_field: Some("startDate"),
    children: &[],
    write_role: Some(ROLE_STAFF),
};

pub static CLASS_SECTION: ResourceDef = ResourceDef {
    name: "ClassSection",
    table: "class_sections",
    fields: &[
        TENANT_ID.required(),
        APP_ID,
        ORG_ID.required(),
        FieldDef::new("className", "class_name", Text(Some(100))).required(),
        FieldDef::new("section", "section", Text(Some(50))),
        FieldDef::new("capacity", "capacity", Integer),
        FieldDef::new("teacherId", "teacher_id", Integer).references("User"),
    ],
    date_field: None,
    children: &[],
    write_role: Some(ROLE_STAFF),
};

pub static APPLICATION_AY_CLASS_SECTION: ResourceDef = ResourceDef {
    name: "ApplicationAYClassSection",
    table: "application_ay_class_sections",
    fields: &[
        TENANT_ID.required(),
        APP_ID,
        ORG_ID,
        APPLICATION_ID.required(),
        ACADEMIC_YEAR_ID.required(),
        CLASS_SECTION_ID.required(),
        FieldDef::new("rollNumber", "roll_number", Text(Some(50))),
    ],
    date_field: None,
    children: &[],
    write_role: Some(ROLE_STAFF),
};

pub static ATTENDANCE: ResourceDef = ResourceDef {
    name: "Attendance",
    table: "attendances",
    fields: &[
        TENANT_ID.required(),
        APP_ID,
        ORG_ID,
        APPLICATION_ID.required(),
        FieldDef::new("attendanceDate", "attendance_date", Date),
        FieldDef::new("attendanceType", "attendance_type", FieldKind::Range(0, 6)).required(),
        FieldDef::new("checkInTime", "check_in_time", Timestamp),
        FieldDef::new("checkOutTime", "check_out_time", Timestamp),
        FieldDef::new("checkInBy", "check_in_by", Integer).references("User"),
        FieldDef::new("checkOutBy", "check_out_by", Integer).references("User"),
        NOTES,
    ],
    date_field: Some("attendanceDate"),
    children: &[],
    write_role: Some(ROLE_STAFF),
};

pub static ACTIVITY: ResourceDef = ResourceDef {
    name: "Activity",
    table: "activities",
    fields: &[
        TENANT_ID.required(),
        APP_ID,
        ORG_ID,
        FieldDef::new("title", "title", Text(Some(255))).required(),
        DESCRIPTION,
        FieldDef::new("activityDate", "activity_date", Date),
        APPLICATION_ID,
        CLASS_SECTION_ID,
        FieldDef::new("mediaUrl", "media_url", Text(None)),
    ],
    date_field: Some("activityDate"),
    children: &[],
    write_role: Some(ROLE_STAFF),
};

pub static FEE_RECEIPT: ResourceDef = ResourceDef {
    name: "FeeReceipt",
    table: "fee_receipts",
    fields: &[
        TENANT_ID.required(),
        APP_ID,
        ORG_ID,
        APPLICATION_ID.required(),
        FieldDef::new("receiptNumber", "receipt_number", Text(Some(50))),
        FieldDef::new("receiptDate", "receipt_date", Date).required(),
        FieldDef::new("amount", "amount", Decimal).required(),
        FieldDef::new(
            "paymentMode",
            "payment_mode",
            Enum(&["cash", "card", "bank_transfer", "cheque", "upi", "other"]),
        ),
        DESCRIPTION,
    ],
    date_field: Some("receiptDate"),
    children: &[],
    write_role: Some(ROLE_STAFF),
};

pub static EXAM: ResourceDef = ResourceDef {
    name: "Exam",
    table: "exams",
    fields: &[
        TENANT_ID.required(),
        APP_ID,
        ORG_ID,
        ACADEMIC_YEAR_ID,
        CLASS_SECTION_ID,
        FieldDef::new("examName", "exam_name", Text(Some(255))).required(),
        FieldDef::new("examDate", "exam_date", Date),
        FieldDef::new("maxMarks", "max_marks", Decimal),
        DESCRIPTION,
    ],
    date_field: Some("examDate"),
    children: &[],
    write_role: Some(ROLE_STAFF),
};

pub static SYLLABUS: ResourceDef = ResourceDef {
    name: "Syllabus",
    table: "syllabi",
    fields: &[
        TENANT_ID.required(),
        APP_ID,
        ORG_ID,
        ACADEMIC_YEAR_ID,
        CLASS_SECTION_ID,
        FieldDef::new("subject", "subject", Text(Some(255))).required(),
        FieldDef::new("topic", "topic", Text(Some(255))),
        DESCRIPTION,
        FieldDef::new("startDate", "start_date", Date),
        FieldDef::new("endDate", "end_date", Date),
    ],
    date_field: Some("startDate"),
    children: &[],
    write_role: Some(ROLE_STAFF),
};

pub static STAFF_ATTENDANCE: ResourceDef = ResourceDef {
    name: "StaffAttendance",
    table: "staff_attendances",
    fields: &[
        TENANT_ID.required(),
        APP_ID,
        ORG_ID,
        USER_ID.required(),
        FieldDef::new("attendanceDate", "attendance_date", Date).required(),
        FieldDef::new("status", "status", Enum(&["present", "absent", "half_day", "on_leave"])),
        FieldDef::new("checkInTime", "check_in_time", Timestamp),
        FieldDef::new("checkOutTime", "check_out_time", Timestamp),
        NOTES,
    ],
    date_field: Some("attendanceDate"),
    children: &[],
    write_role: Some(ROLE_STAFF),
};

pub static STAFF_LEAVE_REQUEST: ResourceDef = ResourceDef {
    name: "StaffLeaveRequest",
    table: "staff_leave_requests",
    fields: &[
        TENANT_ID.required(),
        APP_ID,
        ORG_ID,
        USER_ID.required(),
        FieldDef::new("fromDate", "from_date", Date).required(),
        FieldDef::new("toDate", "to_date", Date).required(),
        FieldDef::new("leaveType", "leave_type", Enum(&["casual", "sick", "earned", "unpaid", "other"])),
        FieldDef::new("reason", "reason", Text(None)),
        FieldDef::new("status", "status", Enum(LEAVE_STATUSES)),
        FieldDef::new("approvedBy", "approved_by", Integer).references("User"),
    ],
    date_field: Some("fromDate"),
    children: &[],
    write_role: Some(ROLE_STAFF),
};

pub static APPLICATION_SCHOLARSHIP: ResourceDef = ResourceDef {
    name: "ApplicationScholarship",
    table: "application_scholarships",
    fields: &[
        TENANT_ID.required(),
        APP_ID,
        ORG_ID,
        APPLICATION_ID.required(),
        ACADEMIC_YEAR_ID,
        FieldDef::new("scholarshipName", "scholarship_name", Text(Some(255))).required(),
        FieldDef::new("amount", "amount", Decimal),
        FieldDef::new("percentage", "percentage", Decimal),
        NOTES,
    ],
    date_field: None,
    children: &[],
    write_role: Some(ROLE_STAFF),
};

pub static ELEMENT_TYPE: ResourceDef = ResourceDef {
    name: "ElementType",
    table: "element_types",
    fields: &[
        FieldDef::new("name", "name", Text(Some(100))).required(),
        DESCRIPTION,
        FieldDef::new("component", "component", Text(Some(100))),
    ],
    date_field: None,
    children: &[ChildDef { resource: "ElementTypeProperty", foreign_key: "element_type_id" }],
    write_role: Some(ROLE_SUPER_ADMIN),
};

pub static ELEMENT_TYPE_PROPERTY: ResourceDef = ResourceDef {
    name: "ElementTypeProperty",
    table: "element_type_properties",
    fields: &[
        ELEMENT_TYPE_ID.required(),
        FieldDef::new("propertyName", "property_name", Text(Some(100))).required(),
        FieldDef::new("propertyType", "property_type", Text(Some(50))),
        FieldDef::new("defaultValue", "default_value", Text(None)),
        FieldDef::new("options", "options", Json),
        FieldDef::new("isRequired", "is_required", Boolean),
        SORT_ORDER,
    ],
    date_field: None,
    children: &[],
    write_role: Some(ROLE_SUPER_ADMIN),
};

pub static APP_ELEMENT: ResourceDef = ResourceDef {
    name: "AppElement",
    table: "app_elements",
    fields: &[
        TENANT_ID.required(),
        APP_ID.required(),
        ELEMENT_TYPE_ID.required(),
        FieldDef::new("name", "name", Text(Some(100))).required(),
        FieldDef::new("label", "label", Text(Some(255))),
        DESCRIPTION,
    ],
    date_field: None,
    children: &[ChildDef { resource: "AppElementProperty", foreign_key: "app_element_id" }],
    write_role: Some(ROLE_ADMIN),
};

pub static APP_ELEMENT_PROPERTY: ResourceDef = ResourceDef {
    name: "AppElementProperty",
    table: "app_element_properties",
    fields: &[
        FieldDef::new("appElementId", "app_element_id", Integer).references("AppElement").required(),
        ELEMENT_TYPE_PROPERTY_ID.required(),
        PROPERTY_VALUE,
    ],
    date_field: None,
    children: &[],
    write_role: Some(ROLE_ADMIN),
};

pub static PAGE: ResourceDef = ResourceDef {
    name: "Page",
    table: "pages",
    fields: &[
        TENANT_ID.required(),
        APP_ID.required(),
        FieldDef::new("name", "name", Text(Some(100))).required(),
        FieldDef::new("title", "title", Text(Some(255))),
        FieldDef::new("route", "route", Text(Some(255))),
        SORT_ORDER,
        FieldDef::new("isPublished", "is_published", Boolean),
    ],
    date_field: None,
    children: &[ChildDef { resource: "PageElement", foreign_key: "page_id" }],
    write_role: Some(ROLE_ADMIN),
};

pub static PAGE_ELEMENT: ResourceDef = ResourceDef {
    name: "PageElement",
    table: "page_elements",
    fields: &[
        TENANT_ID.required(),
        APP_ID.required(),
        FieldDef::new("pageId", "page_id", Integer).references("Page").required(),
        ELEMENT_TYPE_ID.required(),
        FieldDef::new("appElementId", "app_element_id", Integer).references("AppElement"),
        FieldDef::new("parentId", "parent_id", Integer).references("PageElement"),
        FieldDef::new("name", "name", Text(Some(100))),
        FieldDef::new("label", "label", Text(Some(255))),
        SORT_ORDER,
    ],
    date_field: None,
    children: &[ChildDef { resource: "PageElementProperty", foreign_key: "page_element_id" }],
    write_role: Some(ROLE_ADMIN),
};

pub static PAGE_ELEMENT_PROPERTY: ResourceDef = ResourceDef {
    name: "PageElementProperty",
    table: "page_element_properties",
    fields: &[
        FieldDef::new("pageElementId", "page_element_id", Integer).references("PageElement").required(),
        ELEMENT_TYPE_PROPERTY_ID.required(),
        PROPERTY_VALUE,
    ],
    date_field: None,
    children: &[],
    write_role: Some(ROLE_ADMIN),
};

/// Every resource mounted at `/{name}`
pub static RESOURCES: &[&ResourceDef] = &[
    &TENANT,
    &APP,
    &ORGANIZATION,
    &ROLE,
    &USER,
    &USER_LOGIN,
    &USER_ROLE,
    &APPLICATION,
    &ACADEMIC_YEAR,
    &CLASS_SECTION,
    &APPLICATION_AY_CLASS_SECTION,
    &ATTENDANCE,
    &ACTIVITY,
    &FEE_RECEIPT,
    &EXAM,
    &SYLLABUS,
    &STAFF_ATTENDANCE,
    &STAFF_LEAVE_REQUEST,
    &APPLICATION_SCHOLARSHIP,
    &ELEMENT_TYPE,
    &ELEMENT_TYPE_PROPERTY,
    &APP_ELEMENT,
    &APP_ELEMENT_PROPERTY,
    &PAGE,
    &PAGE_ELEMENT,
    &PAGE_ELEMENT_PROPERTY,
];

pub fn find(name: &str) -> Option<&'static ResourceDef> {
    RESOURCES.iter().copied().find(|r| r.name == name)
}
