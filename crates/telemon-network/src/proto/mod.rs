//! Proto 메시지 정의
//!
//! 디바이스 모델 기반 텔레메트리(MDT) envelope과 dial-in 구독 서비스 메시지.
//! 메시지 수가 적어 빌드 스크립트 없이 prost derive로 직접 선언한다.
//! 태그 번호는 디바이스 측 `telemetry.proto` / `mdt_grpc_dialin.proto`와 동일해야 한다.

/// 텔레메트리 envelope (`telemetry.proto`)
pub mod telemetry {
    /// 수집 한 번에 대응하는 envelope
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Telemetry {
        #[prost(string, tag = "1")]
        pub node_id_str: ::prost::alloc::string::String,
        #[prost(string, tag = "3")]
        pub subscription_id_str: ::prost::alloc::string::String,
        #[prost(string, tag = "6")]
        pub encoding_path: ::prost::alloc::string::String,
        #[prost(uint64, tag = "8")]
        pub collection_id: u64,
        #[prost(uint64, tag = "9")]
        pub collection_start_time: u64,
        /// 메시지 타임스탬프 (디바이스는 보통 밀리초)
        #[prost(uint64, tag = "10")]
        pub msg_timestamp: u64,
        /// 자기 기술형 key-value 행 (GPB-KV)
        #[prost(message, repeated, tag = "11")]
        pub data_gpbkv: ::prost::alloc::vec::Vec<TelemetryField>,
        /// 컴팩트 GPB 행 (모델별 스키마 필요)
        #[prost(message, optional, tag = "12")]
        pub data_gpb: ::core::option::Option<TelemetryGpbTable>,
        #[prost(uint64, tag = "13")]
        pub collection_end_time: u64,
    }

    /// key-value 트리 노드. 값이 있으면 리프, `fields`가 있으면 컨테이너.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct TelemetryField {
        #[prost(uint64, tag = "1")]
        pub timestamp: u64,
        #[prost(string, tag = "2")]
        pub name: ::prost::alloc::string::String,
        #[prost(bool, tag = "3")]
        pub augment_data: bool,
        #[prost(oneof = "telemetry_field::ValueByType", tags = "4, 5, 6, 7, 8, 9, 10, 11, 12")]
        pub value_by_type: ::core::option::Option<telemetry_field::ValueByType>,
        #[prost(message, repeated, tag = "15")]
        pub fields: ::prost::alloc::vec::Vec<TelemetryField>,
    }

    pub mod telemetry_field {
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum ValueByType {
            #[prost(bytes = "vec", tag = "4")]
            BytesValue(::prost::alloc::vec::Vec<u8>),
            #[prost(string, tag = "5")]
            StringValue(::prost::alloc::string::String),
            #[prost(bool, tag = "6")]
            BoolValue(bool),
            #[prost(uint32, tag = "7")]
            Uint32Value(u32),
            #[prost(uint64, tag = "8")]
            Uint64Value(u64),
            #[prost(sint32, tag = "9")]
            Sint32Value(i32),
            #[prost(sint64, tag = "10")]
            Sint64Value(i64),
            #[prost(double, tag = "11")]
            DoubleValue(f64),
            #[prost(float, tag = "12")]
            FloatValue(f32),
        }
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct TelemetryGpbTable {
        #[prost(message, repeated, tag = "1")]
        pub row: ::prost::alloc::vec::Vec<TelemetryRowGpb>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct TelemetryRowGpb {
        #[prost(uint64, tag = "1")]
        pub timestamp: u64,
        #[prost(bytes = "vec", tag = "10")]
        pub keys: ::prost::alloc::vec::Vec<u8>,
        #[prost(bytes = "vec", tag = "11")]
        pub content: ::prost::alloc::vec::Vec<u8>,
    }
}

/// dial-in 구독 서비스 (`mdt_grpc_dialin.proto`)
pub mod dialin {
    /// gRPC 메서드 경로
    pub const CREATE_SUBS_PATH: &str =
        "/IOSXRExtensibleManagabilityService.gRPCConfigOper/CreateSubs";

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct CreateSubsArgs {
        #[prost(int64, tag = "1")]
        pub req_id: i64,
        /// 2 = GPB, 3 = GPB-KV, 4 = JSON
        #[prost(int64, tag = "2")]
        pub encode: i64,
        #[prost(string, tag = "3")]
        pub subidstr: ::prost::alloc::string::String,
        #[prost(message, optional, tag = "4")]
        pub qos: ::core::option::Option<QosMarking>,
        #[prost(string, repeated, tag = "5")]
        pub subscriptions: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct QosMarking {
        #[prost(uint32, tag = "1")]
        pub marking: u32,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct CreateSubsReply {
        #[prost(int64, tag = "1")]
        pub res_req_id: i64,
        #[prost(bytes = "vec", tag = "2")]
        pub data: ::prost::alloc::vec::Vec<u8>,
        #[prost(string, tag = "3")]
        pub errors: ::prost::alloc::string::String,
    }
}
